#![allow(dead_code)]

pub mod loopback_dns;
pub mod page_server;
