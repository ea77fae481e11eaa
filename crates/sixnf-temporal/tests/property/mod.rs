//! Property tests for sixnf-temporal.

mod algebra_properties;
