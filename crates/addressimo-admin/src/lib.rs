//! Client core for the addressimo id-object admin API.

pub mod config;
pub mod controllers;
pub mod normalizer;
pub mod record;
pub mod target;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use config::AdminConfig;
pub use controllers::{DetailController, DetailViewState, ListController, ListViewState};
pub use normalizer::{
    API_ROOT, ApiRequest, GenericApiService, NormalizedResult, OBJECT_DELETED_MESSAGE,
    RequestPathError, normalize_outcome, resource_path,
};
pub use record::{KNOWN_ID_OBJECT_FIELDS, ResourceRecord};
pub use target::{
    ApiTarget, ApiTargetResolver, LocationTargetResolver, PageLocation, TargetError, TargetPolicy,
};
pub use transport::{HttpTransport, Method, ReqwestTransport, TransportError, TransportResponse};
