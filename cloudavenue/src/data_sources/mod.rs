//! Data source implementations
//!
//! Each data source shares its superschema with the resource of the same name.

pub mod edge_gateway;
pub mod vdc;

pub use edge_gateway::EdgeGatewayDataSource;
pub use vdc::VdcDataSource;
