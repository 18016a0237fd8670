use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub autoroute: AutorouteConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            autoroute: AutorouteConfig::default(),
            generator: GeneratorConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Allowed trace directions.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AngleRestriction {
    #[default]
    None,
    FortyFive,
    Ninety,
}

/// Whether a line door into an obstacle room that is not a trace may be used.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NonTraceDoorPolicy {
    #[default]
    Admit,
    Reject,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AutorouteConfig {
    #[serde(default)]
    pub angle_restriction: AngleRestriction,
    #[serde(default = "default_true")]
    pub vias_allowed: bool,
    #[serde(default = "default_via_cost")]
    pub via_cost: f64,
    #[serde(default = "default_plane_via_cost")]
    pub plane_via_cost: f64,
    #[serde(default)]
    pub ripup_allowed: bool,
    #[serde(default = "default_ripup_cost")]
    pub ripup_cost: f64,
    #[serde(default = "default_preferred_direction_cost")]
    pub preferred_direction_cost: f64,
    #[serde(default = "default_against_direction_cost")]
    pub against_direction_cost: f64,
    #[serde(default = "default_true")]
    pub with_neckdown: bool,
    #[serde(default)]
    pub fanout: bool,
    #[serde(default = "default_trace_depth")]
    pub max_shove_trace_depth: u32,
    #[serde(default = "default_via_depth")]
    pub max_shove_via_depth: u32,
    #[serde(default = "default_spring_over_depth")]
    pub max_spring_over_depth: u32,
    #[serde(default = "default_pull_tight_accuracy")]
    pub pull_tight_accuracy: i64,
    #[serde(default = "default_door_section_length")]
    pub door_section_length: f64,
    #[serde(default = "default_drill_page_width")]
    pub drill_page_width: i64,
    #[serde(default = "default_max_enlarge_passes")]
    pub max_enlarge_passes: usize,
    #[serde(default = "default_max_rooms")]
    pub max_rooms: usize,
    #[serde(default)]
    pub non_trace_door_policy: NonTraceDoorPolicy,
    #[serde(default = "default_true")]
    pub remove_trace_tails: bool,
}

impl Default for AutorouteConfig {
    fn default() -> Self {
        Self {
            angle_restriction: AngleRestriction::default(),
            vias_allowed: default_true(),
            via_cost: default_via_cost(),
            plane_via_cost: default_plane_via_cost(),
            ripup_allowed: false,
            ripup_cost: default_ripup_cost(),
            preferred_direction_cost: default_preferred_direction_cost(),
            against_direction_cost: default_against_direction_cost(),
            with_neckdown: default_true(),
            fanout: false,
            max_shove_trace_depth: default_trace_depth(),
            max_shove_via_depth: default_via_depth(),
            max_spring_over_depth: default_spring_over_depth(),
            pull_tight_accuracy: default_pull_tight_accuracy(),
            door_section_length: default_door_section_length(),
            drill_page_width: default_drill_page_width(),
            max_enlarge_passes: default_max_enlarge_passes(),
            max_rooms: default_max_rooms(),
            non_trace_door_policy: NonTraceDoorPolicy::default(),
            remove_trace_tails: default_true(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    #[serde(default = "default_board_width")]
    pub width: i64,
    #[serde(default = "default_board_height")]
    pub height: i64,
    #[serde(default = "default_layer_count")]
    pub layers: usize,
    #[serde(default = "default_net_count")]
    pub nets: usize,
    #[serde(default = "default_keepout_count")]
    pub keepouts: usize,
    #[serde(default = "default_pad_size")]
    pub pad_size: i64,
    #[serde(default = "default_clearance")]
    pub clearance: i64,
    #[serde(default = "default_trace_half_width")]
    pub trace_half_width: i64,
    #[serde(default = "default_via_radius")]
    pub via_radius: i64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            width: default_board_width(),
            height: default_board_height(),
            layers: default_layer_count(),
            nets: default_net_count(),
            keepouts: default_keepout_count(),
            pad_size: default_pad_size(),
            clearance: default_clearance(),
            trace_half_width: default_trace_half_width(),
            via_radius: default_via_radius(),
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default = "default_true")]
    pub render: bool,
    #[serde(default = "default_image_width")]
    pub image_width: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            render: default_true(),
            image_width: default_image_width(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_via_cost() -> f64 {
    50.0
}

fn default_plane_via_cost() -> f64 {
    5.0
}

fn default_ripup_cost() -> f64 {
    200.0
}

fn default_preferred_direction_cost() -> f64 {
    1.0
}

fn default_against_direction_cost() -> f64 {
    1.0
}

fn default_trace_depth() -> u32 {
    20
}

fn default_via_depth() -> u32 {
    8
}

fn default_spring_over_depth() -> u32 {
    5
}

fn default_pull_tight_accuracy() -> i64 {
    500
}

fn default_door_section_length() -> f64 {
    2000.0
}

fn default_drill_page_width() -> i64 {
    5000
}

fn default_max_enlarge_passes() -> usize {
    3
}

fn default_max_rooms() -> usize {
    20000
}

fn default_board_width() -> i64 {
    40000
}

fn default_board_height() -> i64 {
    30000
}

fn default_layer_count() -> usize {
    2
}

fn default_net_count() -> usize {
    12
}

fn default_keepout_count() -> usize {
    6
}

fn default_pad_size() -> i64 {
    600
}

fn default_clearance() -> i64 {
    150
}

fn default_trace_half_width() -> i64 {
    100
}

fn default_via_radius() -> i64 {
    300
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_image_width() -> u32 {
    1600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_sections_fall_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
[autoroute]
angle_restriction = "forty_five"
ripup_allowed = true
non_trace_door_policy = "reject"

[generator]
nets = 3
"#,
        )
        .unwrap();
        assert_eq!(config.autoroute.angle_restriction, AngleRestriction::FortyFive);
        assert!(config.autoroute.ripup_allowed);
        assert_eq!(config.autoroute.non_trace_door_policy, NonTraceDoorPolicy::Reject);
        assert_eq!(config.autoroute.via_cost, 50.0);
        assert_eq!(config.generator.nets, 3);
        assert_eq!(config.generator.layers, 2);
        assert_eq!(config.output.dir, "output");
    }
}
