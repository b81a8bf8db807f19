//! HTTP clients for the two remote services.
//!
//! The ship control API drives one vessel (launch, navigate, radar, scan,
//! autopilot step, exit); the fleet API serves the authoritative roster and
//! the full sector grid. Both speak JSON over HTTP with camelCase payloads.
//!
//! The `ShipControl` and `FleetQuery` traits are the seams the navigation
//! orchestrator, the autopilot loops, and the tests program against.

use crate::chart::{Ground, Position, SectorPatch};
use crate::compass::{Heading, HelmCommand};
use crate::error::{Result, TariniError};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A two-component integer vector on the wire.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

/// A wrapped offset vector as the radar payload carries it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OffsetVec {
    pub vec2: [i32; 2],
}

impl OffsetVec {
    pub fn offset(self) -> (i32, i32) {
        (self.vec2[0], self.vec2[1])
    }
}

/// One radar echo: a terrain observation at an offset from the vessel.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub sector: OffsetVec,
    pub height: i32,
    pub ground: Ground,
}

/// An offset the service itself flags as not navigable.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NotNavigable {
    pub vec2: [i32; 2],
}

/// Full radar snapshot for one vessel.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoReport {
    #[serde(default)]
    pub echos: Vec<Echo>,
    #[serde(default)]
    pub not_navigable: Vec<NotNavigable>,
}

/// Depth sounding for the vessel's current sector.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ScanReport {
    pub depth: i32,
    pub stddev: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorData {
    #[serde(default)]
    pub ship_id: Option<String>,
    pub ground: Ground,
    pub sector_x: i32,
    pub sector_y: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub depth: i32,
    #[serde(default)]
    pub stddev: f32,
}

/// Response of one autopilot step: where the vessel ended up plus the
/// terrain cells the step revealed. Both parts are optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    #[serde(default)]
    pub ship_id: Option<String>,
    #[serde(default)]
    pub ship_position: Option<Vec2>,
    #[serde(default)]
    pub sector_data_list: Option<Vec<SectorData>>,
}

impl StepReport {
    /// Terrain updates as chart patches, skipping nothing; the chart drops
    /// out-of-bounds entries itself.
    pub fn patches(&self) -> Vec<SectorPatch> {
        self.sector_data_list
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|sd| SectorPatch {
                position: Position::new(sd.sector_x, sd.sector_y),
                ground: sd.ground,
                depth: sd.depth,
            })
            .collect()
    }
}

/// One roster entry from the fleet service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipRecord {
    #[serde(default)]
    pub ship_id: Option<String>,
    pub ship_name: String,
    pub sector_x: i32,
    pub sector_y: i32,
    pub direction_x: i32,
    pub direction_y: i32,
}

impl ShipRecord {
    pub fn position(&self) -> Position {
        Position::new(self.sector_x, self.sector_y)
    }

    pub fn heading(&self) -> Option<Heading> {
        Heading::from_delta(self.direction_x, self.direction_y)
    }
}

/// One full-grid sector entry from the fleet service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorInfo {
    #[serde(default)]
    pub ship_id: Option<String>,
    pub ground: Ground,
    #[serde(default)]
    pub depth: i32,
    pub sector_x: i32,
    pub sector_y: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipSector {
    #[serde(default)]
    pub ship_id: Option<String>,
    pub ship_sector_x: i32,
    pub ship_sector_y: i32,
}

/// Ship control API surface, one vessel per call.
pub trait ShipControl: Send + Sync {
    /// Launch a vessel. Returns the service-assigned id; the service signals
    /// failure with a plain text body, recognized by the missing id marker.
    fn launch(&self, name: &str, position: Position, heading: Heading) -> Result<String>;

    /// Issue one helm command. `None` means the service rejected the move.
    fn navigate(&self, ship_id: &str, command: HelmCommand) -> Result<Option<(i32, i32)>>;

    fn radar(&self, ship_id: &str) -> Result<EchoReport>;

    fn scan(&self, ship_id: &str) -> Result<ScanReport>;

    /// Ask the service to compute and execute the next autopilot step.
    fn autopilot_step(&self, ship_id: &str) -> Result<StepReport>;

    fn exit(&self, ship_id: &str) -> Result<()>;

    /// Historical path of the vessel, oldest first.
    fn route(&self, ship_id: &str) -> Result<Vec<Position>>;
}

/// Fleet/map API surface: the authoritative roster and terrain grid.
pub trait FleetQuery: Send + Sync {
    fn list_vessels(&self) -> Result<Vec<ShipRecord>>;

    fn load_chart(&self) -> Result<Vec<SectorPatch>>;
}

/// Service-assigned vessel ids carry this marker; any response body without
/// it is a failure text.
const ID_MARKER: char = '#';

/// HTTP client for the ship control API.
pub struct ShipControlClient {
    http: Client,
    base_url: String,
}

impl ShipControlClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check_vessel(&self, status: StatusCode, ship_id: &str) -> Result<()> {
        if status == StatusCode::NOT_FOUND {
            return Err(TariniError::VesselNotFound(ship_id.to_string()));
        }
        Ok(())
    }
}

impl ShipControl for ShipControlClient {
    fn launch(&self, name: &str, position: Position, heading: Heading) -> Result<String> {
        let (dx, dy) = heading.delta();
        let response = self
            .http
            .post(self.url("/api/ship/launch"))
            .query(&[
                ("name", name.to_string()),
                ("x", position.x.to_string()),
                ("y", position.y.to_string()),
                ("dx", dx.to_string()),
                ("dy", dy.to_string()),
            ])
            .send()?;
        let body = response.text()?;
        if body.contains(ID_MARKER) {
            Ok(body)
        } else {
            Err(TariniError::Api(body))
        }
    }

    fn navigate(&self, ship_id: &str, command: HelmCommand) -> Result<Option<(i32, i32)>> {
        let response = self
            .http
            .get(self.url("/api/ship/navigate"))
            .query(&[
                ("shipId", ship_id),
                ("course", command.course.as_str()),
                ("rudder", command.rudder.as_str()),
            ])
            .send()?;
        self.check_vessel(response.status(), ship_id)?;
        let delta: Option<Vec2> = response.error_for_status()?.json()?;
        Ok(delta.map(|v| (v.x, v.y)))
    }

    fn radar(&self, ship_id: &str) -> Result<EchoReport> {
        let response = self
            .http
            .get(self.url("/api/ship/radar"))
            .query(&[("shipId", ship_id)])
            .send()?;
        self.check_vessel(response.status(), ship_id)?;
        Ok(response.error_for_status()?.json()?)
    }

    fn scan(&self, ship_id: &str) -> Result<ScanReport> {
        let response = self
            .http
            .get(self.url("/api/ship/scan"))
            .query(&[("shipId", ship_id)])
            .send()?;
        self.check_vessel(response.status(), ship_id)?;
        Ok(response.error_for_status()?.json()?)
    }

    fn autopilot_step(&self, ship_id: &str) -> Result<StepReport> {
        let response = self
            .http
            .post(self.url("/api/ship/autoPilot"))
            .query(&[("shipId", ship_id)])
            .send()?;
        self.check_vessel(response.status(), ship_id)?;
        Ok(response.error_for_status()?.json()?)
    }

    fn exit(&self, ship_id: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url("/api/ship/exit"))
            .query(&[("shipId", ship_id)])
            .send()?;
        self.check_vessel(response.status(), ship_id)?;
        response.error_for_status()?;
        Ok(())
    }

    fn route(&self, ship_id: &str) -> Result<Vec<Position>> {
        let response = self
            .http
            .get(self.url("/api/ship/route"))
            .query(&[("shipId", ship_id)])
            .send()?;
        self.check_vessel(response.status(), ship_id)?;
        let sectors: Vec<ShipSector> = response.error_for_status()?.json()?;
        Ok(sectors
            .iter()
            .map(|s| Position::new(s.ship_sector_x, s.ship_sector_y))
            .collect())
    }
}

/// HTTP client for the fleet/map API.
pub struct FleetClient {
    http: Client,
    base_url: String,
}

impl FleetClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl FleetQuery for FleetClient {
    fn list_vessels(&self) -> Result<Vec<ShipRecord>> {
        let response = self
            .http
            .get(self.url("/shipBaseServerAPI/getAllShipData"))
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }

    fn load_chart(&self) -> Result<Vec<SectorPatch>> {
        let response = self
            .http
            .get(self.url("/shipBaseServerAPI/allSectorData"))
            .send()?
            .error_for_status()?;
        let sectors: Vec<SectorInfo> = response.json()?;
        Ok(sectors
            .iter()
            .map(|s| SectorPatch {
                position: Position::new(s.sector_x, s.sector_y),
                ground: s.ground,
                depth: s.depth,
            })
            .collect())
    }
}

#[cfg(test)]
pub use mock::{HelmCommandLog, MockFleet, MockShipControl};
