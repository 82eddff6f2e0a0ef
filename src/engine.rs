// Routine engine
// Pure decision logic plus the per-room state it owns. Each tick/event method
// takes a snapshot of external state (zone, scenes, weather, time) and
// returns the commands to execute, so the engine can be driven with
// synthetic time in tests while the daemon performs the network I/O.

use crate::annotation::TimeAnnotation;
use crate::bridge::{Scene, Zone};
use crate::holidays;
use crate::resolver;
use crate::weather::{self, WeatherReport};
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use log::debug;
use std::collections::HashMap;

/// A command for the bridge, produced by a routine decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ActivateScene {
        zone: String,
        scene_id: String,
        scene_name: String,
    },
    SetLights {
        zone: String,
        grouped_light_id: String,
        on: bool,
    },
}

/// Motion routine state for one room. Door-closed is a guard on leaving
/// `CountingDown`, not a state of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionPhase {
    Idle,
    Active,
    CountingDown { deadline: NaiveDateTime },
}

pub struct RoutineEngine {
    temperature_band_f: f64,
    holiday_interval_hours: i64,
    /// last condition scene applied by the weather routine
    weather_last: Option<String>,
    /// last temperature comparison scene shown by the weather routine
    weather_temp_last: Option<String>,
    /// last scene applied per room by the schedule routine
    schedule_last: HashMap<String, String>,
    /// last holiday application per zone, truncated to the hour
    holiday_last: HashMap<String, NaiveDateTime>,
    /// motion phase per room
    motion: HashMap<String, MotionPhase>,
}

impl RoutineEngine {
    pub fn new(temperature_band_f: f64, holiday_interval_hours: u64) -> Self {
        Self {
            temperature_band_f,
            holiday_interval_hours: holiday_interval_hours as i64,
            weather_last: None,
            weather_temp_last: None,
            schedule_last: HashMap::new(),
            holiday_last: HashMap::new(),
            motion: HashMap::new(),
        }
    }

    /// Weather routine: show the inside/outside temperature comparison scene,
    /// then the condition scene. A failed fetch falls back to the "default"
    /// scene when the zone has one.
    pub fn weather_tick(
        &mut self,
        zone: &Zone,
        scenes: &[Scene],
        report: Option<&WeatherReport>,
        inside_temp_f: Option<f64>,
    ) -> Vec<Command> {
        if !zone.lights_on {
            debug!("weather zone '{}' is off, skipping", zone.name);
            return Vec::new();
        }

        let names = scene_names(scenes);

        let condition = match report {
            Some(report) => weather::condition_scene_name(&report.condition, &names),
            // failed fetch: fall back to the default scene if present
            None => names
                .iter()
                .find(|name| name.eq_ignore_ascii_case("default"))
                .map(|name| name.as_str()),
        }
        .and_then(|name| find_scene(scenes, name));

        let temp = match (report, inside_temp_f) {
            (Some(report), Some(inside_f)) => {
                let name = weather::temperature_scene(
                    inside_f,
                    report.feels_like_f,
                    self.temperature_band_f,
                );
                find_scene(scenes, name)
            }
            _ => None,
        };

        let condition_changed = condition
            .is_some_and(|scene| self.weather_last.as_deref() != Some(scene.name.as_str()));
        let temp_changed = temp
            .is_some_and(|scene| self.weather_temp_last.as_deref() != Some(scene.name.as_str()));

        if !condition_changed && !temp_changed {
            if condition.is_none() {
                debug!("no condition or default scene for '{}'", zone.name);
            }
            return Vec::new();
        }

        let mut commands = Vec::new();
        // the temperature comparison shows first; it is only worth flashing
        // when a condition scene will supersede it afterwards
        if let (Some(temp), Some(_)) = (temp, condition) {
            self.weather_temp_last = Some(temp.name.clone());
            commands.push(activate(zone, temp));
        }
        if let Some(condition) = condition {
            self.weather_last = Some(condition.name.clone());
            commands.push(activate(zone, condition));
        }
        commands
    }

    /// Holiday routine: at most one application per suppression window, and
    /// only while the zone's lights are on.
    pub fn holiday_tick(
        &mut self,
        zone: &Zone,
        scenes: &[Scene],
        now: NaiveDateTime,
    ) -> Option<Command> {
        if !zone.lights_on {
            return None;
        }

        let current_hour = truncate_to_hour(now);
        if let Some(last) = self.holiday_last.get(&zone.name) {
            if current_hour < *last + Duration::hours(self.holiday_interval_hours) {
                return None;
            }
        }

        let names = scene_names(scenes);
        let name = holidays::holiday_scene_name(now.date(), &names)?;
        let scene = find_scene(scenes, name)?;

        debug!("it's a holiday! applying '{}' in '{}'", name, zone.name);
        self.holiday_last.insert(zone.name.clone(), current_hour);
        Some(activate(zone, scene))
    }

    /// Scheduled-scene-change routine: activate the currently-due annotated
    /// scene when it differs from the last one applied to this room.
    pub fn schedule_tick(
        &mut self,
        zone: &Zone,
        scenes: &[Scene],
        sunset: Option<NaiveTime>,
        now: NaiveTime,
    ) -> Option<Command> {
        if !zone.lights_on {
            debug!("'{}' is off, not changing scenes", zone.name);
            return None;
        }

        let name = self.resolve_current(zone, scenes, sunset, now)?.to_string();
        if self.schedule_last.get(&zone.name) == Some(&name) {
            return None;
        }

        let scene = find_scene(scenes, &name)?;
        self.schedule_last.insert(zone.name.clone(), name);
        Some(activate(zone, scene))
    }

    /// Button routine: toggle. Lights on turn off; lights off come back on
    /// with the scene that is currently due (or plain on when the room has no
    /// annotated scenes).
    pub fn button_pressed(
        &mut self,
        zone: &Zone,
        scenes: &[Scene],
        sunset: Option<NaiveTime>,
        now: NaiveTime,
    ) -> Command {
        if zone.lights_on {
            return lights(zone, false);
        }

        match self
            .resolve_current(zone, scenes, sunset, now)
            .and_then(|name| find_scene(scenes, name))
        {
            Some(scene) => activate(zone, scene),
            None => lights(zone, true),
        }
    }

    /// Motion routine, sensor edge: motion detected or cleared
    pub fn motion_event(
        &mut self,
        zone: &Zone,
        scenes: &[Scene],
        sunset: Option<NaiveTime>,
        now: NaiveDateTime,
        active: bool,
        off_delay: Duration,
    ) -> Option<Command> {
        if active {
            self.motion.insert(zone.name.clone(), MotionPhase::Active);
            if zone.lights_on {
                return None;
            }
            let command = match self
                .resolve_current(zone, scenes, sunset, now.time())
                .and_then(|name| find_scene(scenes, name))
            {
                Some(scene) => activate(zone, scene),
                None => lights(zone, true),
            };
            Some(command)
        } else {
            let deadline = now + off_delay;
            self.motion
                .insert(zone.name.clone(), MotionPhase::CountingDown { deadline });
            None
        }
    }

    /// Motion routine, countdown check. Past the deadline the lights go off,
    /// unless a companion door sensor reports closed: then the countdown is
    /// held (deadline untouched) until the door opens or motion resumes.
    pub fn motion_timeout_tick(
        &mut self,
        zone: &Zone,
        door_closed: Option<bool>,
        now: NaiveDateTime,
    ) -> Option<Command> {
        let phase = self.motion.get(&zone.name).copied()?;
        let MotionPhase::CountingDown { deadline } = phase else {
            return None;
        };
        if now < deadline {
            return None;
        }
        if door_closed == Some(true) {
            debug!("door closed in '{}', holding lights on", zone.name);
            return None;
        }

        self.motion.insert(zone.name.clone(), MotionPhase::Idle);
        if zone.lights_on {
            Some(lights(zone, false))
        } else {
            None
        }
    }

    /// Current motion phase for a room (Idle when the room has never moved)
    pub fn motion_phase(&self, room: &str) -> MotionPhase {
        self.motion.get(room).copied().unwrap_or(MotionPhase::Idle)
    }

    /// Annotate, resolve and select the scene currently due in this room
    fn resolve_current<'a>(
        &self,
        zone: &Zone,
        scenes: &'a [Scene],
        sunset: Option<NaiveTime>,
        now: NaiveTime,
    ) -> Option<&'a str> {
        let mut candidates = Vec::new();
        for scene in scenes {
            let Some(annotation) = TimeAnnotation::from_scene_name(&scene.name) else {
                if scene.name.trim_end().ends_with(')') {
                    debug!("unrecognized time annotation in '{}'", scene.name);
                }
                continue;
            };
            match annotation.resolve(sunset) {
                Some(instant) => candidates.push((scene.name.clone(), instant)),
                None => debug!(
                    "sunset unknown, skipping '{}' in '{}'",
                    scene.name, zone.name
                ),
            }
        }
        let current = resolver::current_scene(now, &candidates)?;
        // point back into the scene list so the name outlives the candidates
        scenes
            .iter()
            .find(|scene| scene.name == current)
            .map(|scene| scene.name.as_str())
    }
}

fn scene_names(scenes: &[Scene]) -> Vec<String> {
    scenes.iter().map(|scene| scene.name.clone()).collect()
}

fn find_scene<'a>(scenes: &'a [Scene], name: &str) -> Option<&'a Scene> {
    scenes
        .iter()
        .find(|scene| scene.name.eq_ignore_ascii_case(name))
}

fn activate(zone: &Zone, scene: &Scene) -> Command {
    Command::ActivateScene {
        zone: zone.name.clone(),
        scene_id: scene.id.clone(),
        scene_name: scene.name.clone(),
    }
}

fn lights(zone: &Zone, on: bool) -> Command {
    Command::SetLights {
        zone: zone.name.clone(),
        grouped_light_id: zone.grouped_light_id.clone(),
        on,
    }
}

fn truncate_to_hour(datetime: NaiveDateTime) -> NaiveDateTime {
    datetime
        .with_minute(0)
        .and_then(|dt| dt.with_second(0))
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(datetime)
}
