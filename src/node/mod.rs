//! Node boundary: the shared [`Node`](server::Node) handle callers submit,
//! seal, deploy and call through.

pub mod server;
