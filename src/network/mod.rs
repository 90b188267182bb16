/*
 * This module defines the crawl's data model: routers (nodes) and the LDP adjacencies
 * (edges) discovered from them, plus the small IPv4 helpers used to read OID indexes.
 */

pub mod edge;
pub mod ip;
pub mod node;
