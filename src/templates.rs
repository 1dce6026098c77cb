//! Built-in template registry.
//!
//! Templates are embedded at compile time and looked up by name; a name
//! that is not registered here is treated as a filesystem path by the
//! caller.

pub const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        "base16_default_dark",
        include_str!("../templates/base16_default_dark.svg"),
    ),
    ("dracula", include_str!("../templates/dracula.svg")),
    ("gjm8", include_str!("../templates/gjm8.svg")),
    ("gjm8_play", include_str!("../templates/gjm8_play.svg")),
    (
        "gjm8_single_loop",
        include_str!("../templates/gjm8_single_loop.svg"),
    ),
    ("powershell", include_str!("../templates/powershell.svg")),
    ("progress_bar", include_str!("../templates/progress_bar.svg")),
    ("putty", include_str!("../templates/putty.svg")),
    (
        "solarized_dark",
        include_str!("../templates/solarized_dark.svg"),
    ),
    (
        "solarized_light",
        include_str!("../templates/solarized_light.svg"),
    ),
    ("terminal_app", include_str!("../templates/terminal_app.svg")),
    ("ubuntu", include_str!("../templates/ubuntu.svg")),
    ("window_frame", include_str!("../templates/window_frame.svg")),
    (
        "window_frame_js",
        include_str!("../templates/window_frame_js.svg"),
    ),
    (
        "window_frame_powershell",
        include_str!("../templates/window_frame_powershell.svg"),
    ),
    ("xterm", include_str!("../templates/xterm.svg")),
];

/// Default template used when `-t` is absent
pub const DEFAULT_TEMPLATE: &str = "gjm8";

pub fn builtin(name: &str) -> Option<&'static str> {
    BUILTIN_TEMPLATES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, source)| *source)
}

pub fn builtin_names() -> Vec<&'static str> {
    BUILTIN_TEMPLATES.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert!(builtin("gjm8").is_some());
        assert!(builtin("no_such_template").is_none());
    }

    #[test]
    fn test_default_is_registered() {
        assert!(builtin(DEFAULT_TEMPLATE).is_some());
    }

    #[test]
    fn test_registry_is_sorted_and_unique() {
        let names = builtin_names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 16);
    }
}
