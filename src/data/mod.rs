/// Data layer: inputs, assembly, filtering and checks.
///
/// Architecture:
/// ```text
///   config.txt          result files (glob)
///       │                     │
///       ▼                     ▼
///  ┌────────────┐      ┌────────────┐
///  │ descriptor │      │   ground   │  one file per configuration
///  └────────────┘      └────────────┘
///        │                    │
///        └─────────┬──────────┘
///                  ▼
///   ┌──────┐  ┌──────────┐  ┌────────┐
///   │ grid │─▶│ assemble │◀─│ kernel │
///   └──────┘  └──────────┘  └────────┘
///                  │
///                  ▼
///            ┌──────────┐
///            │  filter  │  named constraint → kept rows
///            └──────────┘
///                  │
///                  ▼
///            ┌──────────┐        ┌──────────┐
///            │  table   │──────▶ │ validate │  integrated DOS per k-point
///            └──────────┘        └──────────┘
/// ```
pub mod assemble;
pub mod descriptor;
pub mod filter;
pub mod grid;
pub mod ground;
pub mod kernel;
pub mod params;
pub mod table;
pub mod validate;
