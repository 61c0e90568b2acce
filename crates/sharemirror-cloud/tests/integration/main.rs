//! Integration tests for sharemirror-cloud
//!
//! Uses wiremock to simulate the provider API and drives the
//! `CloudShareProvider` through the `IRemoteShareClient` port.

mod common;

mod test_batch;
mod test_folders;
mod test_listing;
mod test_share;
