mod client;

pub use client::WmataClient;
