pub mod retrieve_request;
pub mod retrieve_route;
