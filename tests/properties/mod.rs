mod retry;
mod signature;
