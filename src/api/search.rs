// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Search filters for the wallhaven search endpoint.
//!
//! The API encodes most filters as query parameters; categories and purity
//! travel as 3-bit strings (`110` = general + anime, `100` = SFW only) and
//! free-text constraints are folded into a single `q` parameter
//! (`sunset -city @alice type:jpg/png`).

use std::fmt;
use std::str::FromStr;

/// Category toggles, encoded as the API's `general/anime/people` bit string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryFilter {
    pub general: bool,
    pub anime: bool,
    pub people: bool,
}

impl CategoryFilter {
    /// All categories enabled (the API default when the parameter is omitted).
    pub fn all() -> Self {
        Self { general: true, anime: true, people: true }
    }

    /// Encode as the 3-bit parameter value, e.g. `101`.
    pub fn bits(&self) -> String {
        format!(
            "{}{}{}",
            u8::from(self.general),
            u8::from(self.anime),
            u8::from(self.people)
        )
    }
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self::all()
    }
}

/// Purity toggles, encoded as the API's `sfw/sketchy/nsfw` bit string.
///
/// NSFW results require a valid API key on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurityFilter {
    pub sfw: bool,
    pub sketchy: bool,
    pub nsfw: bool,
}

impl PurityFilter {
    /// SFW-only (the API default).
    pub fn sfw() -> Self {
        Self { sfw: true, sketchy: false, nsfw: false }
    }

    /// Encode as the 3-bit parameter value, e.g. `100`.
    pub fn bits(&self) -> String {
        format!(
            "{}{}{}",
            u8::from(self.sfw),
            u8::from(self.sketchy),
            u8::from(self.nsfw)
        )
    }
}

impl Default for PurityFilter {
    fn default() -> Self {
        Self::sfw()
    }
}

/// Result ordering methods accepted by the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sorting {
    #[default]
    DateAdded,
    Relevance,
    Random,
    Views,
    Favorites,
    Toplist,
}

impl Sorting {
    /// The parameter value the API expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DateAdded => "date_added",
            Self::Relevance => "relevance",
            Self::Random => "random",
            Self::Views => "views",
            Self::Favorites => "favorites",
            Self::Toplist => "toplist",
        }
    }
}

impl FromStr for Sorting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date_added" => Ok(Self::DateAdded),
            "relevance" => Ok(Self::Relevance),
            "random" => Ok(Self::Random),
            "views" => Ok(Self::Views),
            "favorites" => Ok(Self::Favorites),
            "toplist" => Ok(Self::Toplist),
            other => Err(format!(
                "unknown sorting {:?} (expected date_added, relevance, random, views, favorites or toplist)",
                other
            )),
        }
    }
}

impl fmt::Display for Sorting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desc => "desc",
            Self::Asc => "asc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "desc" => Ok(Self::Desc),
            "asc" => Ok(Self::Asc),
            other => Err(format!("unknown order {:?} (expected desc or asc)", other)),
        }
    }
}

/// Time window for toplist sorting. Only honored when [`Sorting::Toplist`] is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopRange {
    OneDay,
    ThreeDays,
    OneWeek,
    #[default]
    OneMonth,
    ThreeMonths,
    HalfYear,
    OneYear,
}

impl TopRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::ThreeDays => "3d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::HalfYear => "6M",
            Self::OneYear => "1y",
        }
    }
}

impl FromStr for TopRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(Self::OneDay),
            "3d" => Ok(Self::ThreeDays),
            "1w" => Ok(Self::OneWeek),
            "1M" => Ok(Self::OneMonth),
            "3M" => Ok(Self::ThreeMonths),
            "6M" => Ok(Self::HalfYear),
            "1y" => Ok(Self::OneYear),
            other => Err(format!(
                "unknown toplist range {:?} (expected 1d, 3d, 1w, 1M, 3M, 6M or 1y)",
                other
            )),
        }
    }
}

/// Wallpaper search parameters.
///
/// All fields are optional; an empty query asks the API for its defaults
/// (all categories, SFW, sorted by date added).
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Fuzzy tags/keywords to include.
    pub tags: Vec<String>,
    /// Tags/keywords to exclude (sent as `-tag`).
    pub exclude_tags: Vec<String>,
    /// Restrict to uploads by this user (sent as `@user`).
    pub username: Option<String>,
    /// File types, e.g. `jpg`, `png` (sent as `type:jpg/png`).
    pub types: Vec<String>,
    /// Find wallpapers with tags similar to this wallpaper id.
    pub like: Option<String>,
    pub categories: Option<CategoryFilter>,
    pub purity: Option<PurityFilter>,
    pub sorting: Option<Sorting>,
    pub order: Option<SortOrder>,
    pub top_range: Option<TopRange>,
    /// Minimum resolution, e.g. `1920x1080`.
    pub atleast: Option<String>,
    /// Exact resolutions.
    pub resolutions: Vec<String>,
    /// Aspect ratios, e.g. `16x9`.
    pub ratios: Vec<String>,
    /// Dominant colors as hex strings, e.g. `0066cc`.
    pub colors: Vec<String>,
}

impl SearchQuery {
    /// Build the free-text `q` parameter, or `None` when no text constraint is set.
    fn q_param(&self) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();

        if !self.tags.is_empty() {
            parts.push(self.tags.join(" "));
        }
        if !self.exclude_tags.is_empty() {
            parts.push(
                self.exclude_tags
                    .iter()
                    .map(|tag| format!("-{}", tag))
                    .collect::<Vec<_>>()
                    .join(" "),
            );
        }
        if let Some(user) = &self.username {
            parts.push(format!("@{}", user));
        }
        if !self.types.is_empty() {
            parts.push(format!("type:{}", self.types.join("/")));
        }
        if let Some(id) = &self.like {
            parts.push(format!("like:{}", id));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// Render the full set of query pairs for the search endpoint.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(q) = self.q_param() {
            pairs.push(("q", q));
        }
        if let Some(categories) = &self.categories {
            pairs.push(("categories", categories.bits()));
        }
        if let Some(purity) = &self.purity {
            pairs.push(("purity", purity.bits()));
        }
        if let Some(sorting) = &self.sorting {
            pairs.push(("sorting", sorting.as_str().to_string()));
        }
        if let Some(order) = &self.order {
            pairs.push(("order", order.as_str().to_string()));
        }
        if let Some(range) = &self.top_range {
            pairs.push(("topRange", range.as_str().to_string()));
        }
        if let Some(atleast) = &self.atleast {
            pairs.push(("atleast", atleast.clone()));
        }
        if !self.resolutions.is_empty() {
            pairs.push(("resolutions", self.resolutions.join(",")));
        }
        if !self.ratios.is_empty() {
            pairs.push(("ratios", self.ratios.join(",")));
        }
        if !self.colors.is_empty() {
            pairs.push(("colors", self.colors.join(",")));
        }

        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_bits() {
        assert_eq!(CategoryFilter::all().bits(), "111");
        let general_only = CategoryFilter { general: true, anime: false, people: false };
        assert_eq!(general_only.bits(), "100");
        let anime_people = CategoryFilter { general: false, anime: true, people: true };
        assert_eq!(anime_people.bits(), "011");
    }

    #[test]
    fn test_purity_bits() {
        assert_eq!(PurityFilter::sfw().bits(), "100");
        let everything = PurityFilter { sfw: true, sketchy: true, nsfw: true };
        assert_eq!(everything.bits(), "111");
    }

    #[test]
    fn test_q_param_composition() {
        let query = SearchQuery {
            tags: vec!["sunset".into(), "mountains".into()],
            exclude_tags: vec!["city".into()],
            username: Some("alice".into()),
            types: vec!["jpg".into(), "png".into()],
            like: Some("wp1234".into()),
            ..Default::default()
        };

        assert_eq!(
            query.q_param().unwrap(),
            "sunset mountains -city @alice type:jpg/png like:wp1234"
        );
    }

    #[test]
    fn test_empty_query_has_no_pairs() {
        let query = SearchQuery::default();
        assert!(query.q_param().is_none());
        assert!(query.query_pairs().is_empty());
    }

    #[test]
    fn test_query_pairs_include_filters() {
        let query = SearchQuery {
            categories: Some(CategoryFilter { general: true, anime: false, people: false }),
            purity: Some(PurityFilter::sfw()),
            sorting: Some(Sorting::Toplist),
            order: Some(SortOrder::Asc),
            top_range: Some(TopRange::OneWeek),
            atleast: Some("1920x1080".into()),
            resolutions: vec!["2560x1440".into(), "3840x2160".into()],
            ratios: vec!["16x9".into()],
            colors: vec!["0066cc".into()],
            ..Default::default()
        };

        let pairs = query.query_pairs();
        assert!(pairs.contains(&("categories", "100".to_string())));
        assert!(pairs.contains(&("purity", "100".to_string())));
        assert!(pairs.contains(&("sorting", "toplist".to_string())));
        assert!(pairs.contains(&("order", "asc".to_string())));
        assert!(pairs.contains(&("topRange", "1w".to_string())));
        assert!(pairs.contains(&("atleast", "1920x1080".to_string())));
        assert!(pairs.contains(&("resolutions", "2560x1440,3840x2160".to_string())));
        assert!(pairs.contains(&("ratios", "16x9".to_string())));
        assert!(pairs.contains(&("colors", "0066cc".to_string())));
    }

    #[test]
    fn test_sorting_round_trip() {
        for value in ["date_added", "relevance", "random", "views", "favorites", "toplist"] {
            let sorting: Sorting = value.parse().unwrap();
            assert_eq!(sorting.as_str(), value);
        }
        assert!("newest".parse::<Sorting>().is_err());
    }

    #[test]
    fn test_top_range_parsing() {
        assert_eq!("1M".parse::<TopRange>().unwrap(), TopRange::OneMonth);
        assert_eq!("1y".parse::<TopRange>().unwrap(), TopRange::OneYear);
        assert!("2w".parse::<TopRange>().is_err());
    }
}
