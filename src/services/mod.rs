// Services layer - transport, caching, in-flight tracking and the resource builder

pub mod cache;
pub mod resource;
pub mod tracker;
pub mod transport;

pub use cache::{CacheStore, MemoryCache};
pub use resource::{ActionResult, PreparedRequest, Resource};
pub use tracker::PromiseTracker;
pub use transport::{HttpTransport, RequestDescriptor, Transport, TransportResponse};
