/// Discrete time used for every entry window.
pub type Tick = u64;
/// Index of a node within the configured cluster. Node 0 hosts the organisers.
pub type NodeIndex = u16;
/// Node-local sequence number of a channel end.
pub type ObjectIndex = u32;
/// Index of an entry within the end that created it.
pub type EntryIndex = u16;
