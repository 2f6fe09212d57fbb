/// Backend submodules for the push socket and the history fetch
///
/// - `connection`: WebSocket and HTTP establishment
/// - `handlers`: frame routing and action execution
/// - `main_loop`: the runtime thread that ties both to the front end
mod connection;
mod handlers;
mod main_loop;

// Re-export the main backend entry points
pub use connection::fetch_snapshot;
pub use handlers::route_frame;
pub use main_loop::run_backend;
