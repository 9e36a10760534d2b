// Funciones para parsear franjas horarias ("MW9-11", "TH9:30-10:45") y detectar conflictos.
//
// La jornada se mide en minutos desde las 9am. Horas 9-12 son literales,
// horas 1-8 se leen como tarde (13-20). Cada día ocupa 48 bloques de 15
// minutos disjuntos (M=0, T=48, W=96, H=144) y un intervalo ocupa
// `[inicio, fin)`: clases consecutivas no chocan.
use std::collections::BTreeSet;

use crate::error::TimeSlotError;

pub const BLOCK_MINUTES: i32 = 15;
pub const BLOCKS_PER_DAY: u32 = 48;
/// 9am a 9pm.
pub const DAY_MINUTES: i32 = BLOCKS_PER_DAY as i32 * BLOCK_MINUTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
}

impl Weekday {
    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'M' => Some(Weekday::Monday),
            'T' => Some(Weekday::Tuesday),
            'W' => Some(Weekday::Wednesday),
            'H' => Some(Weekday::Thursday),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Weekday::Monday => 'M',
            Weekday::Tuesday => 'T',
            Weekday::Wednesday => 'W',
            Weekday::Thursday => 'H',
        }
    }

    fn block_offset(self) -> u32 {
        match self {
            Weekday::Monday => 0,
            Weekday::Tuesday => BLOCKS_PER_DAY,
            Weekday::Wednesday => 2 * BLOCKS_PER_DAY,
            Weekday::Thursday => 3 * BLOCKS_PER_DAY,
        }
    }
}

/// Franja ya parseada. `start`/`end` conservan el texto original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlot {
    pub raw: String,
    pub days: Vec<Weekday>,
    pub start: String,
    pub end: String,
    pub start_minutes: i32,
    pub end_minutes: i32,
}

impl TimeSlot {
    pub fn day_codes(&self) -> Vec<char> {
        self.days.iter().map(|d| d.code()).collect()
    }

    pub fn duration_minutes(&self) -> i32 {
        self.end_minutes - self.start_minutes
    }

    /// Conjunto global de bloques de 15 minutos ocupados.
    pub fn blocks(&self) -> BTreeSet<u32> {
        let start_block = (self.start_minutes / BLOCK_MINUTES) as u32;
        let end_block = (self.end_minutes / BLOCK_MINUTES) as u32;
        let mut out = BTreeSet::new();
        for day in &self.days {
            for b in start_block..end_block {
                out.insert(day.block_offset() + b);
            }
        }
        out
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        !self.blocks().is_disjoint(&other.blocks())
    }
}

/// Convierte "H" o "H:MM" a minutos desde las 9am.
///
/// `hour >= 9` -> `(hour-9)*60 + minute`; si no, `180 + hour*60 + minute`.
/// La jornada termina a las 9pm (720): horas posteriores o la hora 0 se
/// rechazan para que los bloques de un día no invadan el siguiente.
pub fn to_minutes(t: &str) -> Result<i32, TimeSlotError> {
    let invalid = || TimeSlotError::InvalidTime { value: t.to_string() };
    let tok = t.trim();
    let (h, m) = match tok.split_once(':') {
        Some((h, m)) => (h, m),
        None => (tok, "0"),
    };
    let hour: i32 = h.parse().map_err(|_| invalid())?;
    let minute: i32 = m.parse().map_err(|_| invalid())?;
    if !(0..24).contains(&hour) || !(0..60).contains(&minute) {
        return Err(invalid());
    }
    let minutes = if hour >= 9 {
        (hour - 9) * 60 + minute
    } else {
        180 + hour * 60 + minute
    };
    if hour == 0 || minutes > DAY_MINUTES {
        return Err(invalid());
    }
    Ok(minutes)
}

/// Parsear una franja `<días><inicio>-<fin>`.
///
/// Los días son los caracteres iniciales no numéricos; el resto se separa
/// por `-`. Falla si la cadena está vacía, no tiene parte numérica o no
/// tiene separador.
pub fn parse(raw: &str) -> Result<TimeSlot, TimeSlotError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(TimeSlotError::Empty);
    }
    let digit_at = s
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| TimeSlotError::MissingDigits { raw: raw.to_string() })?;
    let (day_part, time_part) = s.split_at(digit_at);

    let mut days = Vec::new();
    for c in day_part.chars() {
        let day = Weekday::from_code(c)
            .ok_or_else(|| TimeSlotError::UnknownDay { raw: raw.to_string(), day: c })?;
        days.push(day);
    }

    let (start, end) = time_part
        .split_once('-')
        .ok_or_else(|| TimeSlotError::MissingSeparator { raw: raw.to_string() })?;
    let start_minutes = to_minutes(start)?;
    let end_minutes = to_minutes(end)?;
    if end_minutes < start_minutes {
        return Err(TimeSlotError::EndBeforeStart { raw: raw.to_string() });
    }

    Ok(TimeSlot {
        raw: raw.to_string(),
        days,
        start: start.to_string(),
        end: end.to_string(),
        start_minutes,
        end_minutes,
    })
}

pub fn occupied_blocks(raw: &str) -> Result<BTreeSet<u32>, TimeSlotError> {
    Ok(parse(raw)?.blocks())
}

/// True si los bloques ocupados por ambas franjas se intersectan.
pub fn conflicts(a: &str, b: &str) -> Result<bool, TimeSlotError> {
    Ok(!occupied_blocks(a)?.is_disjoint(&occupied_blocks(b)?))
}
