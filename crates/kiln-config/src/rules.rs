//! Per-file-type transformation rules.
//!
//! A [`Rule`] pairs a path test with an ordered list of [`LoaderStep`]s.
//! Steps are *declared* outermost first and *applied* innermost first: the
//! last declared step sees the raw file and the first declared step produces
//! the final module. [`RuleSet::pipeline`] returns steps in apply order.

use regex::{Regex, RegexBuilder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mode::BuildMode;

/// Downlevel target for script rules.
pub const SCRIPT_TARGET: &str = "es2015";

/// Default naming scheme for emitted images.
pub const IMAGE_NAME: &str = "images/[name][hash].[ext]";

/// Default naming scheme for emitted fonts.
pub const FONT_NAME: &str = "fonts/[name][hash].[ext]";

/// Recompression quality for JPEG images.
pub const JPEG_QUALITY: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Markup,
    Script,
    Style,
    Image,
    Font,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub category: RuleCategory,

    /// Regular expression tested against the project-relative path.
    pub test: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub case_insensitive: bool,

    /// Paths matching this expression are skipped even if `test` matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,

    /// Steps in declaration order.
    #[serde(rename = "use")]
    pub steps: Vec<LoaderStep>,
}

impl Rule {
    /// Steps in the order they run against a file.
    pub fn apply_order(&self) -> impl Iterator<Item = &LoaderStep> {
        self.steps.iter().rev()
    }
}

/// A single transform applied to one file's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "loader", rename_all = "kebab-case")]
pub enum LoaderStep {
    /// Include markup verbatim, resolving `<img src>` references.
    Html,

    /// Downlevel modern syntax to `target`.
    Babel { target: String },

    /// Turn CSS into a module that appends a `<style>` element at runtime.
    StyleInject,

    /// Collect CSS into the bundle's extracted stylesheet.
    CssExtract,

    /// Resolve `url()` references to emitted assets.
    Css,

    /// Post-process CSS with the listed plugins, in order.
    Postcss { plugins: Vec<PostcssPlugin> },

    /// Compile SCSS to CSS.
    Sass,

    /// Emit the content under an interpolated name and export its URL.
    File { name: String },

    /// Recompress raster images.
    ImageOptimize { mozjpeg: MozjpegOptions },
}

impl LoaderStep {
    pub fn name(&self) -> &'static str {
        match self {
            LoaderStep::Html => "html",
            LoaderStep::Babel { .. } => "babel",
            LoaderStep::StyleInject => "style-inject",
            LoaderStep::CssExtract => "css-extract",
            LoaderStep::Css => "css",
            LoaderStep::Postcss { .. } => "postcss",
            LoaderStep::Sass => "sass",
            LoaderStep::File { .. } => "file",
            LoaderStep::ImageOptimize { .. } => "image-optimize",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum PostcssPlugin {
    /// Placeholder that leaves CSS untouched.
    Noop,
    /// Size-optimizing pass.
    Cssnano,
    /// Vendor prefixing for the given browserslist queries.
    Autoprefixer { browsers: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MozjpegOptions {
    pub quality: u8,
    pub progressive: bool,
}

impl Default for MozjpegOptions {
    fn default() -> Self {
        Self {
            quality: JPEG_QUALITY,
            progressive: true,
        }
    }
}

/// Build the rule table for `mode`.
pub fn build_rules(mode: BuildMode, browsers: &[String]) -> Vec<Rule> {
    let first_style_step = if mode.is_development() {
        LoaderStep::StyleInject
    } else {
        LoaderStep::CssExtract
    };
    let size_pass = if mode.is_production() {
        PostcssPlugin::Cssnano
    } else {
        PostcssPlugin::Noop
    };

    vec![
        Rule {
            category: RuleCategory::Markup,
            test: r"\.html$".to_string(),
            case_insensitive: false,
            exclude: None,
            steps: vec![LoaderStep::Html],
        },
        Rule {
            category: RuleCategory::Script,
            test: r"\.js$".to_string(),
            case_insensitive: false,
            exclude: Some("node_modules".to_string()),
            steps: vec![LoaderStep::Babel {
                target: SCRIPT_TARGET.to_string(),
            }],
        },
        Rule {
            category: RuleCategory::Style,
            test: r"\.scss$".to_string(),
            case_insensitive: false,
            exclude: Some("node_modules".to_string()),
            steps: vec![
                first_style_step,
                LoaderStep::Css,
                LoaderStep::Postcss {
                    plugins: vec![
                        size_pass,
                        PostcssPlugin::Autoprefixer {
                            browsers: browsers.to_vec(),
                        },
                    ],
                },
                LoaderStep::Sass,
            ],
        },
        Rule {
            category: RuleCategory::Image,
            test: r"images[\\/].+\.(gif|png|jpe?g|svg)$".to_string(),
            case_insensitive: true,
            exclude: None,
            steps: vec![
                LoaderStep::File {
                    name: IMAGE_NAME.to_string(),
                },
                LoaderStep::ImageOptimize {
                    mozjpeg: MozjpegOptions::default(),
                },
            ],
        },
        Rule {
            category: RuleCategory::Font,
            test: r"fonts[\\/].+\.(eot|svg|ttf|woff|woff2)$".to_string(),
            case_insensitive: false,
            exclude: None,
            steps: vec![LoaderStep::File {
                name: FONT_NAME.to_string(),
            }],
        },
    ]
}

struct CompiledRule {
    rule: Rule,
    test: Regex,
    exclude: Option<Regex>,
}

/// Rules with their expressions compiled, ready for matching.
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn compile(rules: &[Rule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                let test = compile_pattern(&rule.test, rule.case_insensitive)?;
                let exclude = rule
                    .exclude
                    .as_deref()
                    .map(|pattern| compile_pattern(pattern, false))
                    .transpose()?;
                Ok(CompiledRule {
                    rule: rule.clone(),
                    test,
                    exclude,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Rules whose test matches `resource` and whose exclude does not.
    pub fn matching<'a>(&'a self, resource: &'a str) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules
            .iter()
            .filter(move |compiled| {
                compiled.test.is_match(resource)
                    && !compiled
                        .exclude
                        .as_ref()
                        .is_some_and(|exclude| exclude.is_match(resource))
            })
            .map(|compiled| &compiled.rule)
    }

    /// All steps for `resource` in apply order.
    ///
    /// Steps from every matching rule are concatenated in rule order and
    /// then reversed, so the last declared step runs first.
    pub fn pipeline(&self, resource: &str) -> Vec<LoaderStep> {
        let mut steps: Vec<LoaderStep> = self
            .matching(resource)
            .flat_map(|rule| rule.steps.iter().cloned())
            .collect();
        steps.reverse();
        steps
    }
}

fn compile_pattern(pattern: &str, case_insensitive: bool) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}
