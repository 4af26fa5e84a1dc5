// src/flavor.rs

//! Architecture handling for Conary flavors
//!
//! Flavors are kept as opaque strings such as `~!bootstrap,ssl is: x86(~i486) x86_64`.
//! PackageKit only needs the architecture, which lives in the `is:`
//! (instruction set) section.

/// Architecture reported for flavors without an instruction set
pub const NOARCH: &str = "noarch";

/// Architecture of a flavor string
pub fn arch_from_flavor(flavor: &str) -> &str {
    let Some((_, isa)) = flavor.split_once("is:") else {
        return NOARCH;
    };

    let arches: Vec<&str> = isa
        .split_whitespace()
        .map(|token| token.split('(').next().unwrap_or(token))
        .filter(|arch| !arch.is_empty())
        .collect();

    if arches.contains(&"x86_64") {
        return "x86_64";
    }
    arches.first().copied().unwrap_or(NOARCH)
}

/// Whether a trove with `flavor` can be installed on `system_arch`
pub fn is_compatible(flavor: &str, system_arch: &str) -> bool {
    let arch = arch_from_flavor(flavor);
    arch == NOARCH || arch == system_arch || (arch == "x86" && system_arch == "x86_64")
}
