// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node archetype groups hosted by the surface.

pub mod packing;
