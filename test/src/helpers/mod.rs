
pub use assertions::{assert_mesh_symmetric, assert_single_master, assert_unique_ids};
pub use test_cluster::TestCluster;
