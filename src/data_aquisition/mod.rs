/*
 * This module provides data aquisition abilites for the crawler.
 * It doesn't care what it gets from a device, just how: scalar GETs and column walks
 * over SNMP, behind the `SnmpTransport` trait so the engine can run against test agents.
 */

pub mod core;
pub mod snmp;

#[cfg(test)]
pub mod mock;
