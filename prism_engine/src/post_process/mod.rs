/// Post-process graph and its topologies (bloom, depth of field, passthrough)

pub mod blit_pass;
pub mod post_process_graph;
pub mod bloom;
pub mod depth_of_field;
pub mod passthrough;

#[cfg(test)]
pub(crate) mod test_support;

pub use blit_pass::*;
pub use post_process_graph::*;
