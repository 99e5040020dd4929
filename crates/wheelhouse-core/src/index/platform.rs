//! Platform tag summary shown on the landing page.

use std::collections::BTreeSet;

/// One-directional display aliases: a tag ending in the first suffix also
/// advertises the same tag with the second suffix. Never applied in reverse.
///
/// Android wheels are tagged with the device ABI (`arm64_v8a`) while
/// installers are usually invoked with the kernel architecture
/// (`--platform=android_24_aarch64`).
pub const PLATFORM_ALIASES: &[(&str, &str)] = &[("arm64_v8a", "aarch64")];

/// Union of `tags`, plus the aliases synthesized by [`PLATFORM_ALIASES`].
pub fn summarize<'a>(tags: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    let mut summary: BTreeSet<String> = tags.into_iter().map(str::to_string).collect();
    let aliases: Vec<String> = summary
        .iter()
        .filter_map(|tag| {
            PLATFORM_ALIASES.iter().find_map(|(from, to)| {
                tag.strip_suffix(from).map(|prefix| format!("{prefix}{to}"))
            })
        })
        .collect();
    summary.extend(aliases);
    summary
}
