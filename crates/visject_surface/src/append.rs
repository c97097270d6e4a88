// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output typing of the Append node.
//!
//! Append concatenates two numeric values; its output is the smallest float
//! vector holding both inputs' components.

use crate::port::PortType;

/// Box index of the first Append input
pub const APPEND_FIRST_BOX: u32 = 0;
/// Box index of the second Append input
pub const APPEND_SECOND_BOX: u32 = 1;
/// Box index of the Append output
pub const APPEND_OUTPUT_BOX: u32 = 2;

/// Component count of a value type (0 for non-numeric types)
pub fn component_count(ty: &PortType) -> u32 {
    ty.component_count()
}

/// Smallest float type holding `count` components, capped at four
pub fn vector_for_components(count: u32) -> PortType {
    match count {
        1 => PortType::Float,
        2 => PortType::Float2,
        3 => PortType::Float3,
        _ => PortType::Float4,
    }
}

/// Output type for the given input types.
///
/// `None` marks a disconnected input. The result is [`PortType::Null`] until
/// both inputs are connected to numeric values.
pub fn append_output_type(first: Option<&PortType>, second: Option<&PortType>) -> PortType {
    let (Some(first), Some(second)) = (first, second) else {
        return PortType::Null;
    };
    let (a, b) = (component_count(first), component_count(second));
    if a == 0 || b == 0 {
        return PortType::Null;
    }
    vector_for_components(a + b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_table() {
        let out = |a: &PortType, b: &PortType| append_output_type(Some(a), Some(b));
        assert_eq!(out(&PortType::Float, &PortType::Int), PortType::Float2);
        assert_eq!(out(&PortType::Float2, &PortType::Float), PortType::Float3);
        assert_eq!(out(&PortType::Float2, &PortType::Double2), PortType::Float4);
        assert_eq!(out(&PortType::Float3, &PortType::Bool), PortType::Float4);
        assert_eq!(out(&PortType::Color, &PortType::Float4), PortType::Float4);
    }

    #[test]
    fn test_undefined_output() {
        assert_eq!(append_output_type(None, Some(&PortType::Float)), PortType::Null);
        assert_eq!(append_output_type(Some(&PortType::Float), None), PortType::Null);
        assert_eq!(append_output_type(None, None), PortType::Null);
        assert_eq!(
            append_output_type(Some(&PortType::String), Some(&PortType::Float)),
            PortType::Null
        );
    }

    #[test]
    fn test_vector_for_components() {
        assert_eq!(vector_for_components(1), PortType::Float);
        assert_eq!(vector_for_components(3), PortType::Float3);
        assert_eq!(vector_for_components(7), PortType::Float4);
    }
}
