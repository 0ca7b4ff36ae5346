pub mod client;
pub mod model;

pub use client::{NotionClient, NotionError, NotionGateway};
pub use model::{
    Block, DatabaseQueryResponse, DateValue, NotionPage, PropertyKind, PropertySet,
    PropertyValue, RichText, SelectOption,
};
