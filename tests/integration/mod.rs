mod logging;
mod sponsored_flow;
