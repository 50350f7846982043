//! Filter graph construction for the cross-fade composition.
//!
//! Building and serializing are separate steps. [`build_graph`] derives the
//! segment timings and produces a typed [`FilterGraph`]; only
//! [`FilterGraph::to_filter_complex`] knows FFmpeg's textual syntax. Both are
//! pure: no clock, no randomness, no I/O.
//!
//! Graph shape for `n` clips:
//!
//! ```text
//! [0:v] -> prep -> [v0] --\
//! [1:v] -> prep -> [v1] ---xfade-> [x1] --\
//! [2:v] -> prep -> [v2] -------------------xfade-> [x2] ... -> title -> [vtitle] -> brand -> [vout]
//! ```

/// Output frame size (portrait 9:16).
pub const OUTPUT_WIDTH: u32 = 1080;
pub const OUTPUT_HEIGHT: u32 = 1920;
pub const OUTPUT_FPS: u32 = 30;

/// Upper bound on clips in one cross-fade chain.
pub const MAX_CLIPS: usize = 6;

pub const DEFAULT_CROSSFADE_SECS: f64 = 0.35;
pub const DEFAULT_TOTAL_SECS: f64 = 15.0;
pub const DEFAULT_BRAND_CAPTION: &str = "Forgotten Histories";

/// Label of the last video node.
pub const TERMINAL_LABEL: &str = "vout";
/// Label of the background audio node, when present.
pub const AUDIO_LABEL: &str = "aout";

const TITLE_LABEL: &str = "vtitle";

// Title overlay window and styling
const TITLE_FONT_SIZE: u32 = 78;
const TITLE_WINDOW: (f64, f64) = (0.3, 3.0);
const TITLE_Y_EXPR: &str = "h*0.30+14*sin(2*PI*t/2.4)";

// Brand caption window and styling
const BRAND_FONT_SIZE: u32 = 44;
const BRAND_WINDOW: (f64, f64) = (0.6, 2.8);
const BRAND_Y_EXPR: &str = "h*0.62";

/// Tunables for [`build_graph`].
#[derive(Debug, Clone, PartialEq)]
pub struct GraphOptions {
    /// Length of each cross-fade (seconds)
    pub crossfade_secs: f64,
    /// Length of the finished video (seconds)
    pub total_secs: f64,
    /// Fixed caption shown under the title
    pub brand_caption: String,
    /// Font used by both overlays; FFmpeg's default font when unset
    pub font_file: Option<String>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            crossfade_secs: DEFAULT_CROSSFADE_SECS,
            total_secs: DEFAULT_TOTAL_SECS,
            brand_caption: DEFAULT_BRAND_CAPTION.to_string(),
            font_file: None,
        }
    }
}

/// Placement of one clip on the output timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentPlan {
    pub start_offset_secs: f64,
    pub duration_secs: f64,
}

/// Round to millisecond precision.
pub fn round_ms(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

/// Number of clips actually used: `min(available, MAX_CLIPS)`, at least one.
pub fn effective_clip_count(available: usize) -> usize {
    available.clamp(1, MAX_CLIPS)
}

/// Derive segment timings from the clip count alone.
///
/// Every segment lasts `(total + crossfade * (n - 1)) / n`, and each one
/// starts a cross-fade before the previous one ends, so the `n - 1` overlaps
/// bring the timeline back to exactly `total`.
pub fn plan_segments(clip_count: usize, crossfade_secs: f64, total_secs: f64) -> Vec<SegmentPlan> {
    let count = effective_clip_count(clip_count);
    let overlaps = (count - 1) as f64;
    let seg_dur = round_ms((total_secs + crossfade_secs * overlaps) / count as f64);

    let mut plans = Vec::with_capacity(count);
    let mut offset = 0.0;
    for i in 0..count {
        if i > 0 {
            offset = round_ms(offset + seg_dur - crossfade_secs);
        }
        plans.push(SegmentPlan {
            start_offset_secs: offset,
            duration_secs: seg_dur,
        });
    }
    plans
}

/// Escape literal text for a filter option value.
///
/// Two levels apply inside `-filter_complex`: the option parser treats
/// `\ ' :` as special, then the graph parser treats `\ ' [ ] , ;` as special.
/// The result is emitted unquoted and every apostrophe and colon in it is
/// preceded by a backslash.
pub fn escape_text(raw: &str) -> String {
    let mut option_level = String::with_capacity(raw.len() * 2);
    for c in raw.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(c);
    }

    let mut graph_level = String::with_capacity(option_level.len() * 2);
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}

/// Kind of a graph node, used for inspection and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Per-clip trim/scale/crop
    Preprocess,
    /// Pairwise cross-fade
    Crossfade,
    /// drawtext overlay
    TextOverlay,
    /// Background audio attenuation
    AudioMix,
}

/// A single `name=key=value:key=value` filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    name: &'static str,
    args: Vec<(Option<&'static str>, String)>,
}

impl Filter {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    fn arg(mut self, key: &'static str, value: impl ToString) -> Self {
        self.args.push((Some(key), value.to_string()));
        self
    }

    /// Positional value, already in filter syntax.
    fn raw(mut self, value: impl ToString) -> Self {
        self.args.push((None, value.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Value of a keyed argument.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| *k == Some(key))
            .map(|(_, v)| v.as_str())
    }

    fn render(&self) -> String {
        if self.args.is_empty() {
            return self.name.to_string();
        }
        let args = self
            .args
            .iter()
            .map(|(key, value)| match key {
                Some(key) => format!("{}={}", key, value),
                None => value.clone(),
            })
            .collect::<Vec<_>>()
            .join(":");
        format!("{}={}", self.name, args)
    }
}

/// A labelled chain: `[in0][in1]f1,f2[out]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    pub kind: NodeKind,
    pub inputs: Vec<String>,
    pub filters: Vec<Filter>,
    pub output: String,
}

impl FilterNode {
    fn render(&self) -> String {
        let inputs: String = self.inputs.iter().map(|l| format!("[{}]", l)).collect();
        let chain = self
            .filters
            .iter()
            .map(Filter::render)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}{}[{}]", inputs, chain, self.output)
    }

    /// The textual form of this node.
    pub fn to_filter_string(&self) -> String {
        self.render()
    }
}

/// Complete graph plus the timings it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    nodes: Vec<FilterNode>,
    segments: Vec<SegmentPlan>,
    terminal: String,
    audio_output: Option<String>,
}

impl FilterGraph {
    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    pub fn segments(&self) -> &[SegmentPlan] {
        &self.segments
    }

    /// Label of the final video node.
    pub fn terminal(&self) -> &str {
        &self.terminal
    }

    /// Label of the audio node, if background audio was attached.
    pub fn audio_output(&self) -> Option<&str> {
        self.audio_output.as_deref()
    }

    /// Number of clip inputs the graph reads (`[0:v]` .. `[n-1:v]`).
    pub fn clip_inputs(&self) -> usize {
        self.count(NodeKind::Preprocess)
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    /// Attach an attenuated background track read from input `input_index`.
    pub fn with_background_audio(mut self, input_index: usize, volume: f64) -> Self {
        self.nodes.push(FilterNode {
            kind: NodeKind::AudioMix,
            inputs: vec![format!("{}:a", input_index)],
            filters: vec![Filter::new("volume").raw(format!("{:.3}", volume))],
            output: AUDIO_LABEL.to_string(),
        });
        self.audio_output = Some(AUDIO_LABEL.to_string());
        self
    }

    /// Serialize to `-filter_complex` syntax.
    pub fn to_filter_complex(&self) -> String {
        self.nodes
            .iter()
            .map(FilterNode::render)
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Build the composition graph for `clip_count` clips.
///
/// Only the first `min(clip_count, MAX_CLIPS)` inputs are referenced.
pub fn build_graph(clip_count: usize, title: &str, options: &GraphOptions) -> FilterGraph {
    let segments = plan_segments(clip_count, options.crossfade_secs, options.total_secs);
    let mut nodes = Vec::with_capacity(segments.len() * 2 + 2);

    for (i, segment) in segments.iter().enumerate() {
        nodes.push(preprocess_node(i, segment.duration_secs));
    }

    let mut current = "v0".to_string();
    for (i, segment) in segments.iter().enumerate().skip(1) {
        let output = format!("x{}", i);
        nodes.push(FilterNode {
            kind: NodeKind::Crossfade,
            inputs: vec![current, format!("v{}", i)],
            filters: vec![Filter::new("xfade")
                .arg("transition", "fade")
                .arg("duration", format!("{:.3}", options.crossfade_secs))
                .arg("offset", format!("{:.3}", segment.start_offset_secs))],
            output: output.clone(),
        });
        current = output;
    }

    nodes.push(FilterNode {
        kind: NodeKind::TextOverlay,
        inputs: vec![current],
        filters: vec![drawtext(
            title,
            TITLE_FONT_SIZE,
            TITLE_Y_EXPR,
            TITLE_WINDOW,
            options.font_file.as_deref(),
        )],
        output: TITLE_LABEL.to_string(),
    });

    nodes.push(FilterNode {
        kind: NodeKind::TextOverlay,
        inputs: vec![TITLE_LABEL.to_string()],
        filters: vec![drawtext(
            &options.brand_caption,
            BRAND_FONT_SIZE,
            BRAND_Y_EXPR,
            BRAND_WINDOW,
            options.font_file.as_deref(),
        )],
        output: TERMINAL_LABEL.to_string(),
    });

    FilterGraph {
        nodes,
        segments,
        terminal: TERMINAL_LABEL.to_string(),
        audio_output: None,
    }
}

/// Trim, pad short sources, then scale to cover and center-crop.
///
/// Scaling before cropping guarantees the crop always has enough pixels.
fn preprocess_node(index: usize, seg_dur: f64) -> FilterNode {
    let seg = format!("{:.3}", seg_dur);
    FilterNode {
        kind: NodeKind::Preprocess,
        inputs: vec![format!("{}:v", index)],
        filters: vec![
            Filter::new("tpad")
                .arg("stop_mode", "clone")
                .arg("stop_duration", &seg),
            Filter::new("trim").arg("start", 0).arg("end", &seg),
            Filter::new("setpts").raw("PTS-STARTPTS"),
            Filter::new("scale")
                .raw(OUTPUT_WIDTH)
                .raw(OUTPUT_HEIGHT)
                .arg("force_original_aspect_ratio", "increase"),
            Filter::new("crop").raw(OUTPUT_WIDTH).raw(OUTPUT_HEIGHT),
            Filter::new("fps").raw(OUTPUT_FPS),
            Filter::new("format").raw("yuv420p"),
            Filter::new("setsar").raw(1),
        ],
        output: format!("v{}", index),
    }
}

fn drawtext(
    text: &str,
    font_size: u32,
    y_expr: &str,
    window: (f64, f64),
    font_file: Option<&str>,
) -> Filter {
    let mut filter = Filter::new("drawtext").arg("expansion", "none");
    if let Some(font) = font_file {
        filter = filter.arg("fontfile", escape_text(font));
    }
    filter
        .arg("text", escape_text(text))
        .arg("fontsize", font_size)
        .arg("fontcolor", "white")
        .arg("x", "(w-text_w)/2")
        .arg("y", y_expr)
        .arg("box", 1)
        .arg("boxcolor", "black@0.45")
        .arg("boxborderw", 24)
        .arg("shadowcolor", "black@0.7")
        .arg("shadowx", 3)
        .arg("shadowy", 3)
        .arg(
            "enable",
            format!("'between(t,{:.3},{:.3})'", window.0, window.1),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// True when some occurrence of `target` is not preceded by an odd run of backslashes.
    fn has_unescaped(s: &str, target: char) -> bool {
        let chars: Vec<char> = s.chars().collect();
        chars.iter().enumerate().any(|(i, &c)| {
            if c != target {
                return false;
            }
            let backslashes = chars[..i].iter().rev().take_while(|&&p| p == '\\').count();
            backslashes % 2 == 0
        })
    }

    /// Undo one level of backslash escaping, as a single FFmpeg parser pass does.
    fn unescape_once(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn test_node_counts_for_every_clip_count() {
        for c in 1..=MAX_CLIPS {
            let graph = build_graph(c, "Gold Rush Tale", &GraphOptions::default());
            assert_eq!(graph.count(NodeKind::Preprocess), c, "clips={c}");
            assert_eq!(graph.count(NodeKind::Crossfade), c - 1, "clips={c}");
            assert_eq!(graph.count(NodeKind::TextOverlay), 2, "clips={c}");
            assert_eq!(graph.terminal(), TERMINAL_LABEL);
            assert_eq!(graph.nodes().last().unwrap().output, TERMINAL_LABEL);

            let terminals = graph
                .nodes()
                .iter()
                .filter(|n| n.output == TERMINAL_LABEL)
                .count();
            assert_eq!(terminals, 1);
        }
    }

    #[test]
    fn test_clip_count_is_capped() {
        let graph = build_graph(8, "Title", &GraphOptions::default());
        assert_eq!(graph.clip_inputs(), MAX_CLIPS);
        assert_eq!(graph.count(NodeKind::Crossfade), MAX_CLIPS - 1);
        assert!(!graph.to_filter_complex().contains("[6:v]"));
        assert_eq!(effective_clip_count(0), 1);
    }

    #[test]
    fn test_segment_timeline_sums_to_total() {
        for c in 1..=MAX_CLIPS {
            let plans = plan_segments(c, DEFAULT_CROSSFADE_SECS, DEFAULT_TOTAL_SECS);
            assert_eq!(plans.len(), c);
            assert_eq!(plans[0].start_offset_secs, 0.0);

            for pair in plans.windows(2) {
                assert!(pair[1].start_offset_secs >= pair[0].start_offset_secs);
            }

            let last = plans[c - 1];
            let end = last.start_offset_secs + last.duration_secs;
            let tolerance = 0.001 * c as f64;
            assert!(
                (end - DEFAULT_TOTAL_SECS).abs() <= tolerance,
                "clips={c} end={end}"
            );
        }
    }

    #[test]
    fn test_six_clip_offsets() {
        let plans = plan_segments(6, 0.35, 15.0);
        // (15 + 0.35 * 5) / 6 = 2.791666.. -> 2.792
        assert_eq!(plans[0].duration_secs, 2.792);
        assert_eq!(plans[1].start_offset_secs, 2.442);
        assert_eq!(plans[5].start_offset_secs, 12.21);
    }

    #[test]
    fn test_xfade_offsets_follow_plan() {
        let graph = build_graph(3, "Title", &GraphOptions::default());
        let fades: Vec<&FilterNode> = graph
            .nodes()
            .iter()
            .filter(|n| n.kind == NodeKind::Crossfade)
            .collect();

        for (node, plan) in fades.iter().zip(graph.segments().iter().skip(1)) {
            let offset: f64 = node.filters[0].get("offset").unwrap().parse().unwrap();
            assert_eq!(offset, plan.start_offset_secs);
            assert_eq!(node.filters[0].get("transition"), Some("fade"));
            assert_eq!(node.filters[0].get("duration"), Some("0.350"));
        }
        assert_eq!(fades[0].inputs, vec!["v0", "v1"]);
        assert_eq!(fades[1].inputs, vec!["x1", "v2"]);
    }

    #[test]
    fn test_single_clip_feeds_overlays_directly() {
        let graph = build_graph(1, "Title", &GraphOptions::default());
        let text_nodes: Vec<&FilterNode> = graph
            .nodes()
            .iter()
            .filter(|n| n.kind == NodeKind::TextOverlay)
            .collect();
        assert_eq!(text_nodes[0].inputs, vec!["v0"]);
        assert_eq!(graph.segments()[0].duration_secs, 15.0);
    }

    #[test]
    fn test_scale_precedes_crop() {
        let graph = build_graph(2, "Title", &GraphOptions::default());
        let prep = &graph.nodes()[0];
        let names: Vec<&str> = prep.filters.iter().map(Filter::name).collect();
        let scale = names.iter().position(|n| *n == "scale").unwrap();
        let crop = names.iter().position(|n| *n == "crop").unwrap();
        assert!(scale < crop);
        assert!(prep
            .to_filter_string()
            .starts_with("[0:v]tpad=stop_mode=clone:stop_duration="));
        assert!(prep.to_filter_string().contains("crop=1080:1920"));
        assert!(prep.to_filter_string().ends_with("[v0]"));
    }

    #[test]
    fn test_overlay_windows() {
        let graph = build_graph(2, "Title", &GraphOptions::default());
        let serialized = graph.to_filter_complex();
        assert!(serialized.contains("enable='between(t,0.300,3.000)'"));
        assert!(serialized.contains("enable='between(t,0.600,2.800)'"));
        assert!(serialized.contains("sin(2*PI*t/2.4)"));
        assert!(serialized.contains("boxcolor=black@0.45"));
        assert!(serialized.contains("shadowcolor=black@0.7"));
    }

    #[test]
    fn test_escape_text_handles_apostrophe_and_colon() {
        let raw = "The Titanic's Last Night: 1912";
        let escaped = escape_text(raw);
        assert_eq!(escaped, "The Titanic\\\\\\'s Last Night\\\\: 1912");

        // Graph parser sees no bare quote
        assert!(!has_unescaped(&escaped, '\''));
        // Option parser sees no bare quote or separator
        let option_level = unescape_once(&escaped);
        assert!(!has_unescaped(&option_level, '\''));
        assert!(!has_unescaped(&option_level, ':'));
        assert_eq!(unescape_once(&option_level), raw);
    }

    #[test]
    fn test_title_is_escaped_in_graph() {
        let title = "It's 10:30: Rome's Fall";
        let graph = build_graph(2, title, &GraphOptions::default());
        let title_node = graph
            .nodes()
            .iter()
            .find(|n| n.kind == NodeKind::TextOverlay)
            .unwrap();
        let text = title_node.filters[0].get("text").unwrap();
        assert!(!has_unescaped(text, '\''));
        let option_level = unescape_once(text);
        assert!(!has_unescaped(&option_level, ':'));
        assert_eq!(unescape_once(&option_level), title);
        assert!(!graph.to_filter_complex().contains("text=It's"));
    }

    #[test]
    fn test_font_file_is_escaped() {
        let options = GraphOptions {
            font_file: Some("C:/Fonts/Oswald.ttf".to_string()),
            ..Default::default()
        };
        let graph = build_graph(1, "Title", &options);
        let serialized = graph.to_filter_complex();
        assert!(serialized.contains("fontfile=C\\\\:/Fonts/Oswald.ttf"));
    }

    #[test]
    fn test_background_audio_node() {
        let graph = build_graph(2, "Title", &GraphOptions::default()).with_background_audio(2, 0.18);
        assert_eq!(graph.audio_output(), Some(AUDIO_LABEL));
        assert!(graph.to_filter_complex().ends_with(";[2:a]volume=0.180[aout]"));
        assert_eq!(graph.count(NodeKind::AudioMix), 1);
    }

    #[test]
    fn test_build_graph_is_deterministic() {
        let options = GraphOptions::default();
        let a = build_graph(5, "Lost Roman Legion", &options).to_filter_complex();
        let b = build_graph(5, "Lost Roman Legion", &options).to_filter_complex();
        assert_eq!(a, b);
    }
}
