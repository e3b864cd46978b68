pub mod echo;

pub use echo::Echo;
