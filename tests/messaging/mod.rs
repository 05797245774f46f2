//! End-to-end tests of the message service over the in-memory store and a
//! recording broker.

mod broker_tests;
mod contact_tests;
mod conversation_tests;
