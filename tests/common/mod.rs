#![allow(dead_code)]

pub(crate) mod fixtures;

pub(crate) mod logging;

pub(crate) mod mock_aggregator;
