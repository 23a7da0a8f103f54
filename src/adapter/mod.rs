pub mod grpc;
pub mod handler;
pub mod repository;
