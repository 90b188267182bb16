/*
 * Protocol parsers turn raw SNMP tables into adjacencies.
 * Only LDP is handled; vendor differences live inside `ldp_parser`.
 */

pub mod ldp_parser;
