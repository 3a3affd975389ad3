pub mod generate;
pub mod health_route;
pub mod rag;
pub mod retrieve;
pub mod root_route;
