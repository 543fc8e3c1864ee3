pub mod wmata;
