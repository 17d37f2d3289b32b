mod common;
mod placement;
mod report;
