mod filter;
mod frame;
mod io;
mod status;
