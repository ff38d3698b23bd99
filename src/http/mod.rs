pub mod response;
pub mod server;

pub use response::ResponseWriter;
pub use server::Server;
