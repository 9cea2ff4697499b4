use crate::{Team, TeamId, clamp_points};

/// Owns the team collection and every points mutation on it.
///
/// Mutations return the updated record; whoever caches a derived view (a
/// rendered table, a remote copy) refreshes it from that.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Standings {
    teams: Vec<Team>,
}

impl Standings {
    pub fn new(teams: Vec<Team>) -> Self {
        Self { teams }
    }

    /// Engine over teams in whatever order a store returned them. Teams are
    /// put in id order first, so tied points always rank the same way.
    pub fn from_unordered(mut teams: Vec<Team>) -> Self {
        teams.sort_by(|a, b| a.id.cmp(&b.id));
        Self::new(teams)
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Points descending. Ties keep collection order.
    pub fn standings(&self) -> Vec<Team> {
        let mut sorted = self.teams.clone();
        sorted.sort_by(|a, b| b.points.total_cmp(&a.points));
        sorted
    }

    /// 1-based position in [`Standings::standings`].
    pub fn rank(&self, id: &TeamId) -> Option<usize> {
        self.standings().iter().position(|t| &t.id == id).map(|i| i + 1)
    }

    pub fn find(&self, id: &TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| &t.id == id)
    }

    /// Case-insensitive exact match; the first team in collection order wins.
    pub fn find_by_name(&self, name: &str) -> Option<&Team> {
        let name = name.trim().to_lowercase();
        self.teams.iter().find(|t| t.name.to_lowercase() == name)
    }

    /// Team by id first, then by name.
    pub fn lookup(&self, key: &str) -> Option<&Team> {
        self.find(&TeamId::from(key.trim())).or_else(|| self.find_by_name(key))
    }

    pub fn max_points(&self) -> f64 {
        self.teams.iter().map(|t| t.points).fold(0.0, f64::max)
    }

    pub fn adjust_points(&mut self, id: &TeamId, delta: f64) -> Option<Team> {
        let team = self.teams.iter_mut().find(|t| &t.id == id)?;
        team.points = adjusted(team.points, delta);
        Some(team.clone())
    }

    pub fn add_points(&mut self, id: &TeamId, amount: f64) -> Option<Team> {
        self.adjust_points(id, amount)
    }

    pub fn remove_points(&mut self, id: &TeamId, amount: f64) -> Option<Team> {
        self.adjust_points(id, -amount)
    }

    pub fn set_points(&mut self, id: &TeamId, value: f64) -> Option<Team> {
        let team = self.teams.iter_mut().find(|t| &t.id == id)?;
        team.points = clamp_points(value);
        Some(team.clone())
    }

    pub fn add_points_by_name(&mut self, name: &str, amount: f64) -> Option<Team> {
        let id = self.find_by_name(name)?.id.clone();
        self.add_points(&id, amount)
    }

    pub fn remove_points_by_name(&mut self, name: &str, amount: f64) -> Option<Team> {
        let id = self.find_by_name(name)?.id.clone();
        self.remove_points(&id, amount)
    }

    pub fn set_points_by_name(&mut self, name: &str, value: f64) -> Option<Team> {
        let id = self.find_by_name(name)?.id.clone();
        self.set_points(&id, value)
    }

    /// Swap in a fresh snapshot, e.g. one delivered by a subscription. The
    /// snapshot is put in id order like [`Standings::from_unordered`].
    pub fn replace(&mut self, teams: Vec<Team>) -> &Self {
        *self = Self::from_unordered(teams);
        self
    }

    /// Keep in place the record a write just returned. A team not seen
    /// before goes in at its id position.
    pub fn upsert(&mut self, team: Team) {
        match self.teams.iter_mut().find(|t| t.id == team.id) {
            Some(existing) => *existing = team,
            None => {
                let at = self.teams.partition_point(|t| t.id < team.id);
                self.teams.insert(at, team);
            }
        }
    }
}

/// `max(0, points + delta)`, with non-finite deltas ignored.
pub fn adjusted(points: f64, delta: f64) -> f64 {
    let delta = if delta.is_finite() { delta } else { 0.0 };
    clamp_points(points + delta)
}

/// Admin free-text amount. Anything that is not a finite number reads as 0.
pub fn parse_points(input: &str) -> f64 {
    input
        .trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .unwrap_or(0.0)
}

/// `12345.5` -> `"12,345.5"`. Whole numbers print without decimals and at
/// most two decimals are kept.
pub fn format_points(points: f64) -> String {
    let rounded = (points * 100.0).round() / 100.0;
    let text = format!("{rounded:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (whole, fraction) = match digits.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Standings {
        Standings::new(vec![
            Team::new(1, "A", "#FFFFFF", 10.0),
            Team::new(2, "B", "#000000", 30.0),
            Team::new(3, "C", "#1255CC", 10.0),
        ])
    }

    fn ids(teams: &[Team]) -> Vec<&str> {
        teams.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn standings_sort_descending_and_keep_ties_stable() {
        let engine = engine();
        assert_eq!(ids(&engine.standings()), vec!["2", "1", "3"]);
        assert_eq!(engine.rank(&TeamId::from(3)), Some(3));
        assert_eq!(engine.rank(&TeamId::from(9)), None);
    }

    #[test]
    fn removing_more_than_available_floors_at_zero() {
        let mut engine = Standings::new(vec![Team::new(7, "Law", "#B7B7B7", 50.0)]);
        let updated = engine.remove_points(&TeamId::from(7), 80.0).unwrap();
        assert_eq!(updated.points, 0.0);
    }

    #[test]
    fn remove_is_negative_adjust() {
        let mut a = engine();
        let mut b = engine();
        let id = TeamId::from(1);
        assert_eq!(a.remove_points(&id, 4.0), b.adjust_points(&id, -4.0));
    }

    #[test]
    fn set_points_clamps_and_coerces() {
        let mut engine = engine();
        let id = TeamId::from(2);
        assert_eq!(engine.set_points(&id, -5.0).unwrap().points, 0.0);
        assert_eq!(engine.set_points(&id, f64::NAN).unwrap().points, 0.0);
        assert_eq!(engine.set_points(&id, f64::INFINITY).unwrap().points, 0.0);
        assert_eq!(engine.set_points(&id, 42.5).unwrap().points, 42.5);
    }

    #[test]
    fn unknown_team_is_left_alone() {
        let mut engine = engine();
        assert_eq!(engine.add_points(&TeamId::from(99), 5.0), None);
        assert_eq!(engine, self::engine());
    }

    #[test]
    fn name_lookup_is_case_insensitive_first_match() {
        let mut engine = Standings::new(vec![
            Team::new(1, "Biology", "#000000", 1.0),
            Team::new(2, "biology", "#000000", 2.0),
        ]);
        assert_eq!(engine.find_by_name("BIOLOGY").map(|t| t.id.as_str()), Some("1"));
        let updated = engine.add_points_by_name("bIoLoGy", 4.0).unwrap();
        assert_eq!(updated.id, TeamId::from(1));
        assert_eq!(updated.points, 5.0);
        assert_eq!(engine.set_points_by_name("nobody", 3.0), None);
    }

    #[test]
    fn lookup_accepts_id_or_name() {
        let engine = engine();
        assert_eq!(engine.lookup("2").map(|t| t.name.as_str()), Some("B"));
        assert_eq!(engine.lookup("c").map(|t| t.name.as_str()), Some("C"));
    }

    #[test]
    fn store_order_does_not_decide_ties() {
        // Firestore lists documents by name, so "10" arrives before "2".
        let snapshot = || vec![Team::new("10", "Law", "#B7B7B7", 5.0), Team::new("2", "MIMM", "#1255CC", 5.0)];
        assert_eq!(ids(&Standings::from_unordered(snapshot()).standings()), vec!["2", "10"]);

        let mut engine = Standings::default();
        assert_eq!(ids(&engine.replace(snapshot()).standings()), vec!["2", "10"]);

        engine.upsert(Team::new("3", "Arts", "#000000", 5.0));
        assert_eq!(ids(&engine.standings()), vec!["2", "3", "10"]);
    }

    #[test]
    fn replace_swaps_snapshot() {
        let mut engine = engine();
        let snapshot = engine.replace(vec![Team::new(4, "D", "#000000", 1.0)]).clone();
        assert_eq!(ids(snapshot.teams()), vec!["4"]);
    }

    #[test]
    fn non_numeric_input_reads_as_zero() {
        assert_eq!(parse_points("25"), 25.0);
        assert_eq!(parse_points(" 1,250.5 "), 1250.5);
        assert_eq!(parse_points("abc"), 0.0);
        assert_eq!(parse_points(""), 0.0);
        assert_eq!(parse_points("NaN"), 0.0);
    }

    #[test]
    fn points_format_with_grouping() {
        assert_eq!(format_points(0.0), "0");
        assert_eq!(format_points(950.0), "950");
        assert_eq!(format_points(2963.9), "2,963.9");
        assert_eq!(format_points(5013.4), "5,013.4");
        assert_eq!(format_points(1234567.891), "1,234,567.89");
        assert_eq!(format_points(2148.41), "2,148.41");
    }
}
