//! Meridian API provider.
//!
//! Reference fetch adapter: pulls the league list, then per league the base
//! `1x2` market and the double-chance market, and merges both odds groups
//! into one record per event. Per-league and per-event failures are logged
//! and skipped; only a failure to reach the league list fails the fetch.

use super::http::ApiClient;
use super::{OddsProvider, ProviderError};
use crate::matching::normalize_team_name;
use crate::models::{BettingInstitution, MatchOddsRecord, OddsMap, Outcome, Sport};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

const MERIDIAN_SPORT_FOOTBALL_ID: i64 = 58;
const MERIDIAN_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Bet group selector in the events URL: 0 is the base `1x2` market,
/// 1 is double chance.
const BET_GROUP_BASE: u8 = 0;
const BET_GROUP_DOUBLE_CHANCE: u8 = 1;

/// Endpoint configuration. The events URL is a template with
/// `{league_id}`, `{date}` and `{bet_group}` placeholders.
#[derive(Debug, Clone)]
pub struct MeridianConfig {
    pub leagues_url: String,
    pub events_url: String,
}

impl Default for MeridianConfig {
    fn default() -> Self {
        Self {
            leagues_url: "https://meridianbet.com/sails/sport/get".to_string(),
            events_url: "https://meridianbet.com/sails/events/league/{league_id}?start={date}&group={bet_group}"
                .to_string(),
        }
    }
}

pub struct MeridianProvider {
    client: ApiClient,
    config: MeridianConfig,
}

impl MeridianProvider {
    pub fn new(config: MeridianConfig) -> Self {
        Self {
            client: ApiClient::new(),
            config,
        }
    }

    fn events_url(&self, league_id: i64, bet_group: u8) -> String {
        let date = Utc::now().format(MERIDIAN_DATE_FORMAT).to_string();
        self.config
            .events_url
            .replace("{league_id}", &league_id.to_string())
            .replace("{date}", &date)
            .replace("{bet_group}", &bet_group.to_string())
    }

    async fn league_name_ids(&self) -> Result<Vec<(String, i64)>, ProviderError> {
        let response: LeaguesResponse = self.client.get_json(&self.config.leagues_url).await?;

        let football = response
            .sports
            .into_iter()
            .find(|s| s.id == MERIDIAN_SPORT_FOOTBALL_ID)
            .ok_or_else(|| {
                ProviderError::NoData("there are no data for football league ids".to_string())
            })?;

        let mut league_name_ids = Vec::new();
        for region in football.regions {
            for league in region.leagues {
                // Single-event leagues carry nothing worth fetching.
                if league.number_of_events > 1 {
                    league_name_ids.push((league.name, league.id));
                }
            }
        }
        Ok(league_name_ids)
    }

    async fn fetch_league(
        &self,
        league_name: &str,
        league_id: i64,
    ) -> Result<Vec<MatchOddsRecord>, ProviderError> {
        let base: EventsResponse = self
            .client
            .get_json(&self.events_url(league_id, BET_GROUP_BASE))
            .await?;
        let mut records = parse_base_events(league_name, &base)?;

        let double_chance: EventsResponse = self
            .client
            .get_json(&self.events_url(league_id, BET_GROUP_DOUBLE_CHANCE))
            .await?;
        merge_double_chance_events(&mut records, &double_chance);

        Ok(records.into_values().collect())
    }
}

#[async_trait]
impl OddsProvider for MeridianProvider {
    async fn fetch_matches(&self, sport: Sport) -> Result<Vec<MatchOddsRecord>, ProviderError> {
        match sport {
            Sport::Football => {}
        }

        let leagues = self.league_name_ids().await?;
        if leagues.is_empty() {
            warn!("meridian: there are no leagues to be parsed");
            return Ok(Vec::new());
        }

        let mut all_records = Vec::new();
        for (league_name, league_id) in leagues {
            match self.fetch_league(&league_name, league_id).await {
                Ok(records) => all_records.extend(records),
                Err(e) => {
                    warn!(league = %league_name, error = %e, "meridian: skipping league");
                }
            }
        }
        Ok(all_records)
    }

    fn institution(&self) -> BettingInstitution {
        BettingInstitution::Meridian
    }

    fn provider_name(&self) -> &str {
        "MeridianApi"
    }
}

// ============================================================================
// Wire Types & Parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct LeaguesResponse {
    #[serde(default)]
    sports: Vec<SportNode>,
}

#[derive(Debug, Deserialize)]
struct SportNode {
    id: i64,
    #[serde(default)]
    regions: Vec<RegionNode>,
}

#[derive(Debug, Deserialize)]
struct RegionNode {
    #[serde(default)]
    leagues: Vec<LeagueNode>,
}

#[derive(Debug, Deserialize)]
struct LeagueNode {
    id: i64,
    name: String,
    #[serde(rename = "numberOfEvents", default)]
    number_of_events: i64,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<EventGroup>,
}

#[derive(Debug, Deserialize)]
struct EventGroup {
    #[serde(default)]
    events: Vec<EventNode>,
}

#[derive(Debug, Deserialize)]
struct EventNode {
    name: Option<String>,
    #[serde(default)]
    team: Vec<TeamNode>,
    #[serde(rename = "startTime")]
    start_time: Option<String>,
    #[serde(rename = "standardShortMarkets", default)]
    markets: Vec<Option<MarketNode>>,
}

#[derive(Debug, Deserialize)]
struct TeamNode {
    name: String,
}

#[derive(Debug, Deserialize)]
struct MarketNode {
    #[serde(rename = "templateName", default)]
    template_name: String,
    #[serde(default)]
    selection: Vec<SelectionNode>,
}

#[derive(Debug, Deserialize)]
struct SelectionNode {
    name: Option<String>,
    price: Option<serde_json::Value>,
}

fn parse_price(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_start_time(raw: &str) -> Result<DateTime<Utc>, ProviderError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, MERIDIAN_DATE_FORMAT)
        .map(|dt| dt.and_utc())
        .map_err(|_| ProviderError::InvalidMatchData(format!("bad startTime {:?}", raw)))
}

fn base_market_odds(markets: &[Option<MarketNode>]) -> OddsMap {
    let mut odds = OddsMap::new();
    for market in markets.iter().flatten() {
        if market.template_name != "1x2" {
            continue;
        }
        for selection in &market.selection {
            let price = match selection.price.as_ref().and_then(parse_price) {
                Some(p) => p,
                None => continue,
            };
            match selection.name.as_deref() {
                Some("[[Rival1]]") => {
                    odds.insert(Outcome::HomeWin, price);
                }
                Some("draw") => {
                    odds.insert(Outcome::Draw, price);
                }
                Some("[[Rival2]]") => {
                    odds.insert(Outcome::AwayWin, price);
                }
                _ => {}
            }
        }
    }
    odds
}

fn double_chance_market_odds(markets: &[Option<MarketNode>]) -> OddsMap {
    let mut odds = OddsMap::new();
    for market in markets.iter().flatten() {
        if market.template_name != "Double chance" {
            continue;
        }
        for selection in &market.selection {
            let price = match selection.price.as_ref().and_then(parse_price) {
                Some(p) => p,
                None => continue,
            };
            match selection.name.as_deref() {
                Some("1X") => {
                    odds.insert(Outcome::HomeOrDraw, price);
                }
                Some("12") => {
                    odds.insert(Outcome::HomeOrAway, price);
                }
                Some("X2") => {
                    odds.insert(Outcome::DrawOrAway, price);
                }
                _ => {}
            }
        }
    }
    odds
}

/// Build one record per event from the base bet group, keyed by the
/// source's event name so the double-chance pass can merge into it.
fn parse_base_events(
    league_name: &str,
    response: &EventsResponse,
) -> Result<HashMap<String, MatchOddsRecord>, ProviderError> {
    if response.events.is_empty() {
        return Err(ProviderError::NoData(format!(
            "there are no league events for league {}",
            league_name
        )));
    }

    let mut records = HashMap::new();
    for group in &response.events {
        for event in &group.events {
            match parse_one_event(league_name, event) {
                Ok((event_name, record)) => {
                    records.insert(event_name, record);
                }
                Err(e) => {
                    warn!(league = %league_name, error = %e, "meridian: skipping event");
                }
            }
        }
    }
    Ok(records)
}

fn parse_one_event(
    league_name: &str,
    event: &EventNode,
) -> Result<(String, MatchOddsRecord), ProviderError> {
    let event_name = event
        .name
        .clone()
        .ok_or_else(|| ProviderError::InvalidMatchData("event without name".to_string()))?;

    if event.team.len() < 2 {
        return Err(ProviderError::InvalidMatchData(format!(
            "event {} has no team pair",
            event_name
        )));
    }
    let player_home_display = event.team[0].name.clone();
    let player_away_display = event.team[1].name.clone();

    let start_time = event
        .start_time
        .as_deref()
        .ok_or_else(|| ProviderError::InvalidMatchData("no date_time information".to_string()))?;
    let date_time = parse_start_time(start_time)?;

    let bet_odds = base_market_odds(&event.markets);

    let record = MatchOddsRecord {
        player_home: normalize_team_name(&player_home_display),
        player_away: normalize_team_name(&player_away_display),
        player_home_display,
        player_away_display,
        sport: Sport::Football,
        date_time,
        league: Some(league_name.to_string()),
        tournament: None,
        bet_odds,
    };
    Ok((event_name, record))
}

/// Fold the double-chance odds into the base records, keyed by event name.
/// Events unknown to the base pass are ignored.
fn merge_double_chance_events(
    records: &mut HashMap<String, MatchOddsRecord>,
    response: &EventsResponse,
) {
    for group in &response.events {
        for event in &group.events {
            let Some(event_name) = event.name.as_deref() else {
                continue;
            };
            let Some(record) = records.get_mut(event_name) else {
                continue;
            };
            record.bet_odds.extend(double_chance_market_odds(&event.markets));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_response() -> EventsResponse {
        serde_json::from_value(json!({
            "events": [{
                "events": [{
                    "name": "Barcelona - Real Madrid",
                    "team": [{"name": "FC Barcelona"}, {"name": "Real Madrid"}],
                    "startTime": "2022-02-05T18:30:00",
                    "standardShortMarkets": [
                        null,
                        {
                            "templateName": "1x2",
                            "selection": [
                                {"name": "[[Rival1]]", "price": 2.1},
                                {"name": "draw", "price": "3.4"},
                                {"name": "[[Rival2]]", "price": 3.0}
                            ]
                        },
                        {
                            "templateName": "Total goals",
                            "selection": [{"name": "over", "price": 1.9}]
                        }
                    ]
                }]
            }]
        }))
        .unwrap()
    }

    fn double_chance_response() -> EventsResponse {
        serde_json::from_value(json!({
            "events": [{
                "events": [{
                    "name": "Barcelona - Real Madrid",
                    "standardShortMarkets": [{
                        "templateName": "Double chance",
                        "selection": [
                            {"name": "1X", "price": 1.3},
                            {"name": "12", "price": 1.2},
                            {"name": "X2", "price": 1.6}
                        ]
                    }]
                }]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_base_events() {
        let records = parse_base_events("La Liga", &base_response()).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records["Barcelona - Real Madrid"];
        assert_eq!(record.player_home, "barcelona");
        assert_eq!(record.player_away, "madrid");
        assert_eq!(record.player_home_display, "FC Barcelona");
        assert_eq!(record.league.as_deref(), Some("La Liga"));
        assert_eq!(record.bet_odds.get(&Outcome::HomeWin), Some(&2.1));
        // String-typed prices parse too.
        assert_eq!(record.bet_odds.get(&Outcome::Draw), Some(&3.4));
        // Unrelated markets do not leak into the odds map.
        assert_eq!(record.bet_odds.len(), 3);
    }

    #[test]
    fn test_double_chance_merges_into_base_record() {
        let mut records = parse_base_events("La Liga", &base_response()).unwrap();
        merge_double_chance_events(&mut records, &double_chance_response());

        let odds = &records["Barcelona - Real Madrid"].bet_odds;
        assert_eq!(odds.len(), 6);
        assert_eq!(odds.get(&Outcome::HomeOrDraw), Some(&1.3));
        assert_eq!(odds.get(&Outcome::HomeOrAway), Some(&1.2));
        assert_eq!(odds.get(&Outcome::DrawOrAway), Some(&1.6));
    }

    #[test]
    fn test_event_without_teams_is_skipped() {
        let response: EventsResponse = serde_json::from_value(json!({
            "events": [{
                "events": [
                    {"name": "broken event", "startTime": "2022-02-05T18:30:00"},
                    {
                        "name": "Sevilla - Betis",
                        "team": [{"name": "Sevilla"}, {"name": "Real Betis"}],
                        "startTime": "2022-02-05T20:00:00",
                        "standardShortMarkets": []
                    }
                ]
            }]
        }))
        .unwrap();

        let records = parse_base_events("La Liga", &response).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records.contains_key("Sevilla - Betis"));
    }

    #[test]
    fn test_empty_events_is_no_data() {
        let response: EventsResponse = serde_json::from_value(json!({"events": []})).unwrap();
        let err = parse_base_events("La Liga", &response).unwrap_err();
        assert!(matches!(err, ProviderError::NoData(_)));
    }

    #[test]
    fn test_parse_start_time_formats() {
        assert!(parse_start_time("2022-02-05T18:30:00").is_ok());
        assert!(parse_start_time("2022-02-05T18:30:00Z").is_ok());
        assert!(parse_start_time("half past six").is_err());
    }
}
