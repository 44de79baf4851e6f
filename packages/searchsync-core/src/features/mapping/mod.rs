pub mod mapper;

pub use mapper::ResultMapper;
