mod common;
mod hydration;
mod validation;
mod waiver;
