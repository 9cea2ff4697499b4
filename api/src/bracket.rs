//! Bracket layout: turns a stored [`Bracket`] into the columns, cards and
//! connector directions a view draws. Pure; no I/O.

use crate::standings::Standings;
use crate::{Bracket, Match, Team, TeamId};
use std::fmt;

pub const ROUND_NAMES: [&str; 5] = ["Round of 16", "Quarterfinals", "Semifinals", "Finals", "Champion"];
pub const FINALS_LABEL: &str = "Finals";
pub const THIRD_PLACE_LABEL: &str = "3rd Place";
pub const TBD_COLOR: &str = "#999";

pub fn round_name(round: usize) -> String {
    ROUND_NAMES
        .get(round)
        .map(|name| (*name).to_owned())
        .unwrap_or_else(|| format!("Round {}", round + 1))
}

/// Position of a match in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchSlot {
    pub round: usize,
    pub index: usize,
}

impl MatchSlot {
    pub fn new(round: usize, index: usize) -> Self {
        Self { round, index }
    }

    /// The match the winner of this one advances to.
    pub fn next_slot(self) -> MatchSlot {
        MatchSlot { round: self.round + 1, index: self.index / 2 }
    }

    /// Line drawn out of this match toward [`MatchSlot::next_slot`]. The
    /// final and the round feeding it get none.
    pub fn connector(self, total_rounds: usize) -> Connector {
        if self.round + 2 >= total_rounds {
            Connector::None
        } else if self.index % 2 == 0 {
            Connector::Down
        } else {
            Connector::Up
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    None,
    /// Upper match of a pair: line runs down to the pair's midpoint.
    Down,
    /// Lower match of a pair: line runs up to the pair's midpoint.
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner,
    Loser,
    Neutral,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamBadge {
    pub name: String,
    pub color: String,
    pub dark_text: bool,
    pub tbd: bool,
}

impl TeamBadge {
    pub fn tbd() -> Self {
        Self { name: "TBD".into(), color: TBD_COLOR.into(), dark_text: false, tbd: true }
    }

    pub fn team(team: &Team) -> Self {
        Self {
            name: team.name.clone(),
            color: team.color.clone(),
            dark_text: team.dark_text,
            tbd: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSide {
    pub badge: TeamBadge,
    pub score: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMatch {
    pub slot: MatchSlot,
    pub time: Option<String>,
    pub connector: Connector,
    pub team1: RenderedSide,
    pub team2: RenderedSide,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoundBlock {
    Round { title: String, matches: Vec<RenderedMatch> },
    /// Last round: the final plus the optional third-place match.
    Finals { final_match: Option<RenderedMatch>, third_place: Option<RenderedMatch> },
}

impl RoundBlock {
    pub fn title(&self) -> &str {
        match self {
            RoundBlock::Round { title, .. } => title,
            RoundBlock::Finals { .. } => FINALS_LABEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BracketLayout {
    NotSetUp,
    Rounds(Vec<RoundBlock>),
}

/// Resolves bracket slot ids to teams. Ids compare by string form.
pub trait TeamLookup {
    fn team(&self, id: &TeamId) -> Option<&Team>;
}

impl TeamLookup for [Team] {
    fn team(&self, id: &TeamId) -> Option<&Team> {
        self.iter().find(|t| &t.id == id)
    }
}

impl TeamLookup for Vec<Team> {
    fn team(&self, id: &TeamId) -> Option<&Team> {
        self.as_slice().team(id)
    }
}

impl TeamLookup for Standings {
    fn team(&self, id: &TeamId) -> Option<&Team> {
        self.find(id)
    }
}

/// Lay out a bracket. A missing document and a bracket without rounds both
/// come back as [`BracketLayout::NotSetUp`].
pub fn render<L: TeamLookup + ?Sized>(bracket: Option<&Bracket>, teams: &L) -> BracketLayout {
    let Some(bracket) = bracket.filter(|b| !b.rounds.is_empty()) else {
        return BracketLayout::NotSetUp;
    };

    let total = bracket.rounds.len();
    let blocks = bracket
        .rounds
        .iter()
        .enumerate()
        .map(|(r, round)| {
            if r + 1 == total {
                RoundBlock::Finals {
                    final_match: round
                        .matches
                        .first()
                        .map(|m| render_match(m, MatchSlot::new(r, 0), Connector::None, teams)),
                    third_place: bracket
                        .third_place
                        .as_ref()
                        .map(|m| render_match(m, MatchSlot::new(r, 1), Connector::None, teams)),
                }
            } else {
                RoundBlock::Round {
                    title: round_name(r),
                    matches: round
                        .matches
                        .iter()
                        .enumerate()
                        .map(|(i, m)| {
                            let slot = MatchSlot::new(r, i);
                            render_match(m, slot, slot.connector(total), teams)
                        })
                        .collect(),
                }
            }
        })
        .collect();

    BracketLayout::Rounds(blocks)
}

fn render_match<L: TeamLookup + ?Sized>(m: &Match, slot: MatchSlot, connector: Connector, teams: &L) -> RenderedMatch {
    let side = |id: Option<&TeamId>, other: Option<&TeamId>, score: Option<f64>| RenderedSide {
        badge: id
            .and_then(|id| teams.team(id))
            .map(TeamBadge::team)
            .unwrap_or_else(TeamBadge::tbd),
        score: format_score(score),
        outcome: outcome(id, other, m.winner.as_ref()),
    };

    RenderedMatch {
        slot,
        time: m.time.clone().filter(|t| !t.trim().is_empty()),
        connector,
        team1: side(m.team1.as_ref(), m.team2.as_ref(), m.score1),
        team2: side(m.team2.as_ref(), m.team1.as_ref(), m.score2),
    }
}

/// Only a declared winner that occupies one of the two slots counts; an
/// empty slot is never winner or loser.
pub fn outcome(slot: Option<&TeamId>, other: Option<&TeamId>, winner: Option<&TeamId>) -> Outcome {
    match (slot, winner) {
        (Some(slot), Some(winner)) if slot == winner => Outcome::Winner,
        (Some(_), Some(winner)) if other == Some(winner) => Outcome::Loser,
        _ => Outcome::Neutral,
    }
}

/// Whole scores print without decimals; absent ones as `-`.
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(s) if s.is_finite() && s.fract() == 0.0 => format!("{}", s as i64),
        Some(s) if s.is_finite() => s.to_string(),
        _ => "-".into(),
    }
}

/// Problems in stored bracket data. Reported, never repaired.
#[derive(Debug, Clone, PartialEq)]
pub enum BracketIssue {
    /// Winner names neither occupant.
    StrayWinner { slot: MatchSlot, winner: TeamId },
    /// A round that is not half the size of the one before it.
    RoundSize { round: usize, expected: usize, found: usize },
    StrayThirdPlaceWinner { winner: TeamId },
}

impl fmt::Display for BracketIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketIssue::StrayWinner { slot, winner } => write!(
                f,
                "{} match {}: winner {winner} is not playing in it",
                round_name(slot.round),
                slot.index + 1
            ),
            BracketIssue::RoundSize { round, expected, found } => write!(
                f,
                "{} has {found} matches, expected {expected}",
                round_name(*round)
            ),
            BracketIssue::StrayThirdPlaceWinner { winner } => {
                write!(f, "{THIRD_PLACE_LABEL}: winner {winner} is not playing in it")
            }
        }
    }
}

pub fn validate(bracket: &Bracket) -> Vec<BracketIssue> {
    let mut issues = Vec::new();
    let stray = |m: &Match| {
        m.winner
            .as_ref()
            .filter(|w| m.team1.as_ref() != Some(*w) && m.team2.as_ref() != Some(*w))
            .cloned()
    };

    for (r, round) in bracket.rounds.iter().enumerate() {
        if r > 0 {
            let expected = bracket.rounds[r - 1].matches.len().div_ceil(2);
            if round.matches.len() != expected {
                issues.push(BracketIssue::RoundSize { round: r, expected, found: round.matches.len() });
            }
        }
        for (i, m) in round.matches.iter().enumerate() {
            if let Some(winner) = stray(m) {
                issues.push(BracketIssue::StrayWinner { slot: MatchSlot::new(r, i), winner });
            }
        }
    }
    if let Some(winner) = bracket.third_place.as_ref().and_then(stray) {
        issues.push(BracketIssue::StrayThirdPlaceWinner { winner });
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Round;

    fn teams() -> Vec<Team> {
        vec![
            Team::new(1, "First Year", "#F1C231", 0.0),
            Team::new(2, "MIMM", "#1255CC", 0.0),
            Team::new(3, "Math/Physics", "#990001", 0.0),
            Team::new(4, "Environment", "#F2E1AF", 0.0),
        ]
    }

    fn game(team1: Option<u32>, team2: Option<u32>, winner: Option<u32>) -> Match {
        Match {
            team1: team1.map(TeamId::from),
            team2: team2.map(TeamId::from),
            winner: winner.map(TeamId::from),
            ..Default::default()
        }
    }

    fn round(matches: Vec<Match>) -> Round {
        Round { matches }
    }

    fn blocks(layout: BracketLayout) -> Vec<RoundBlock> {
        match layout {
            BracketLayout::Rounds(blocks) => blocks,
            BracketLayout::NotSetUp => panic!("expected rounds"),
        }
    }

    #[test]
    fn empty_and_missing_brackets_are_not_set_up() {
        assert_eq!(render(None, &teams()), BracketLayout::NotSetUp);
        assert_eq!(render(Some(&Bracket::default()), &teams()), BracketLayout::NotSetUp);
        let third_only = Bracket { rounds: vec![], third_place: Some(game(Some(1), Some(2), None)) };
        assert_eq!(render(Some(&third_only), &teams()), BracketLayout::NotSetUp);
    }

    #[test]
    fn four_round_bracket_connectors_and_titles() {
        let bracket = Bracket {
            rounds: vec![
                round(vec![Match::default(); 8]),
                round(vec![Match::default(); 4]),
                round(vec![Match::default(); 2]),
                round(vec![Match::default(); 1]),
            ],
            third_place: Some(Match::default()),
        };
        let blocks = blocks(render(Some(&bracket), &teams()));
        assert_eq!(blocks.len(), 4);

        let titles: Vec<&str> = blocks.iter().map(RoundBlock::title).collect();
        assert_eq!(titles, vec!["Round of 16", "Quarterfinals", "Semifinals", "Finals"]);

        let RoundBlock::Round { matches, .. } = &blocks[0] else { panic!("round") };
        let connectors: Vec<Connector> = matches.iter().map(|m| m.connector).collect();
        assert_eq!(connectors[..4], [Connector::Down, Connector::Up, Connector::Down, Connector::Up]);

        let RoundBlock::Round { matches, .. } = &blocks[1] else { panic!("round") };
        let connectors: Vec<Connector> = matches.iter().map(|m| m.connector).collect();
        assert_eq!(connectors, [Connector::Down, Connector::Up, Connector::Down, Connector::Up]);

        let RoundBlock::Round { matches, .. } = &blocks[2] else { panic!("round") };
        assert!(matches.iter().all(|m| m.connector == Connector::None));

        let RoundBlock::Finals { final_match, third_place } = &blocks[3] else { panic!("finals") };
        assert_eq!(final_match.as_ref().map(|m| m.connector), Some(Connector::None));
        assert!(third_place.is_some());
    }

    #[test]
    fn single_round_is_just_the_final() {
        let bracket = Bracket { rounds: vec![round(vec![game(Some(1), Some(2), Some(2))])], third_place: None };
        let blocks = blocks(render(Some(&bracket), &teams()));
        let [RoundBlock::Finals { final_match: Some(m), third_place: None }] = blocks.as_slice() else {
            panic!("expected a lone finals block")
        };
        assert_eq!(m.team2.outcome, Outcome::Winner);
        assert_eq!(m.team1.outcome, Outcome::Loser);
    }

    #[test]
    fn empty_final_round_has_no_final_match() {
        let bracket = Bracket { rounds: vec![round(vec![Match::default(); 2]), round(vec![])], third_place: None };
        let blocks = blocks(render(Some(&bracket), &teams()));
        assert_eq!(blocks[1], RoundBlock::Finals { final_match: None, third_place: None });
    }

    #[test]
    fn empty_normal_round_keeps_its_title() {
        let bracket = Bracket {
            rounds: vec![round(vec![]), round(vec![]), round(vec![Match::default()])],
            third_place: None,
        };
        let blocks = blocks(render(Some(&bracket), &teams()));
        assert_eq!(blocks[0], RoundBlock::Round { title: "Round of 16".into(), matches: vec![] });
    }

    #[test]
    fn rounds_past_the_name_table_are_numbered() {
        assert_eq!(round_name(2), "Semifinals");
        assert_eq!(round_name(4), "Champion");
        assert_eq!(round_name(5), "Round 6");
    }

    #[test]
    fn outcomes_follow_declared_winner() {
        let bracket = Bracket {
            rounds: vec![round(vec![game(Some(1), None, Some(1)), game(Some(3), Some(4), Some(2))])],
            third_place: None,
        };
        let two_rounds = Bracket { rounds: vec![bracket.rounds[0].clone(), round(vec![])], third_place: None };
        let blocks = blocks(render(Some(&two_rounds), &teams()));
        let RoundBlock::Round { matches, .. } = &blocks[0] else { panic!("round") };

        // Winner against an empty slot: the empty side is never the loser.
        assert_eq!(matches[0].team1.outcome, Outcome::Winner);
        assert_eq!(matches[0].team2.outcome, Outcome::Neutral);
        assert!(matches[0].team2.badge.tbd);

        // Winner outside the match marks nobody.
        assert_eq!(matches[1].team1.outcome, Outcome::Neutral);
        assert_eq!(matches[1].team2.outcome, Outcome::Neutral);
    }

    #[test]
    fn unknown_team_renders_tbd_but_still_plays() {
        let m = game(Some(99), Some(1), Some(99));
        let rendered = render_match(&m, MatchSlot::new(0, 0), Connector::None, teams().as_slice());
        assert_eq!(rendered.team1.badge, TeamBadge::tbd());
        assert_eq!(rendered.team1.outcome, Outcome::Winner);
        assert_eq!(rendered.team2.outcome, Outcome::Loser);
        assert_eq!(rendered.team2.badge.name, "First Year");
        assert!(rendered.team2.badge.dark_text);
    }

    #[test]
    fn string_and_number_ids_resolve_alike() {
        let m: Match = serde_json::from_str(r#"{"team1": "2", "team2": 3, "score1": 3, "score2": 1.5}"#).unwrap();
        let rendered = render_match(&m, MatchSlot::new(0, 0), Connector::None, &teams());
        assert_eq!(rendered.team1.badge.name, "MIMM");
        assert_eq!(rendered.team2.badge.name, "Math/Physics");
        assert_eq!(rendered.team1.score, "3");
        assert_eq!(rendered.team2.score, "1.5");
    }

    #[test]
    fn scores_format() {
        assert_eq!(format_score(None), "-");
        assert_eq!(format_score(Some(0.0)), "0");
        assert_eq!(format_score(Some(12.0)), "12");
        assert_eq!(format_score(Some(f64::NAN)), "-");
    }

    #[test]
    fn slots_advance_to_half_index() {
        assert_eq!(MatchSlot::new(0, 5).next_slot(), MatchSlot::new(1, 2));
        assert_eq!(MatchSlot::new(1, 0).next_slot(), MatchSlot::new(2, 0));
        assert_eq!(MatchSlot::new(0, 3).connector(4), Connector::Up);
        assert_eq!(MatchSlot::new(2, 0).connector(4), Connector::None);
        assert_eq!(MatchSlot::new(0, 0).connector(1), Connector::None);
    }

    #[test]
    fn validate_reports_stray_winners_and_round_sizes() {
        let bracket = Bracket {
            rounds: vec![
                round(vec![game(Some(1), Some(2), Some(1)), game(Some(3), Some(4), Some(2))]),
                round(vec![Match::default(), Match::default()]),
            ],
            third_place: Some(game(Some(2), Some(4), Some(1))),
        };
        let issues = validate(&bracket);
        assert_eq!(
            issues,
            vec![
                BracketIssue::StrayWinner { slot: MatchSlot::new(0, 1), winner: TeamId::from(2) },
                BracketIssue::RoundSize { round: 1, expected: 1, found: 2 },
                BracketIssue::StrayThirdPlaceWinner { winner: TeamId::from(1) },
            ]
        );
        assert_eq!(issues[1].to_string(), "Quarterfinals has 2 matches, expected 1");
        assert!(validate(&crate::seed::brackets().remove(0).1).is_empty());
    }
}
