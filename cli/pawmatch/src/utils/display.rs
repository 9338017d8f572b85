use std::fmt::Display;

use itertools::Itertools;
use pawmatch_catalog::Candidate;
use pawmatch_sdk::models::favorites::FavoritesLedger;
use pawmatch_sdk::models::matching::MatchResult;

const FAVORITE_MARKER: &str = "★";

/// A single candidate on one line
pub struct DisplayCandidate<'a>(pub &'a Candidate);

impl Display for DisplayCandidate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let candidate = self.0;
        write!(
            f,
            "{name} ({breed}, {age} {years}, {zip})",
            name = candidate.name,
            breed = candidate.breed,
            age = candidate.age,
            years = if candidate.age == 1 { "year" } else { "years" },
            zip = candidate.zip_code,
        )
    }
}

/// A page of candidates in a table-ish format, marking favorites
pub struct DisplayCandidates<'a> {
    candidates: &'a [Candidate],
    favorites: Option<&'a FavoritesLedger>,
}

impl<'a> DisplayCandidates<'a> {
    pub fn new(candidates: &'a [Candidate]) -> Self {
        Self {
            candidates,
            favorites: None,
        }
    }

    pub fn with_favorites(mut self, favorites: &'a FavoritesLedger) -> Self {
        self.favorites = Some(favorites);
        self
    }
}

impl Display for DisplayCandidates<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name_width = self
            .candidates
            .iter()
            .map(|c| c.name.chars().count())
            .max()
            .unwrap_or_default();
        let breed_width = self
            .candidates
            .iter()
            .map(|c| c.breed.chars().count())
            .max()
            .unwrap_or_default();

        let lines = self.candidates.iter().map(|candidate| {
            let marker = match self.favorites {
                Some(favorites) if favorites.is_favorite(&candidate.id) => FAVORITE_MARKER,
                _ => " ",
            };
            format!(
                "{marker} {name:<name_width$}  {breed:<breed_width$}  {age:>2}  {zip:<5}  {id}",
                name = candidate.name,
                breed = candidate.breed,
                age = candidate.age,
                zip = candidate.zip_code,
                id = candidate.id,
            )
        });

        write!(f, "{}", lines.format("\n"))
    }
}

/// The result of a match request
pub struct DisplayMatch<'a>(pub &'a MatchResult);

impl Display for DisplayMatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            MatchResult::Candidate(candidate) => {
                write!(f, "{}", DisplayCandidate(candidate))?;
                write!(f, "\n  {}", candidate.img)
            },
            MatchResult::Identifier(id) => write!(f, "dog with id '{id}'"),
        }
    }
}
