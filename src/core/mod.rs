pub mod echo;

pub use echo::EchoService;
