//! Process-wide unit table.
//!
//! Base units are centimetre, gram, second and kelvin, so volumes come out in
//! millilitres and flow rates in mL/s. Conversion factors are taken from the
//! `uom` SI definitions when the table is first used.

use std::sync::OnceLock;

use uom::si::f64::{
    Frequency, Length, Mass, ThermodynamicTemperature, Time, Volume,
};
use uom::si::{frequency, length, mass, thermodynamic_temperature, time, volume};

use super::Dimension;

/// One named unit: `base = value * factor + offset`.
#[derive(Debug, Clone)]
pub struct UnitDef {
    /// Canonical symbol used when printing.
    pub symbol: &'static str,
    pub aliases: &'static [&'static str],
    pub dimension: Dimension,
    pub factor: f64,
    pub offset: f64,
}

impl UnitDef {
    fn scaled(
        symbol: &'static str,
        aliases: &'static [&'static str],
        dimension: Dimension,
        factor: f64,
    ) -> Self {
        Self {
            symbol,
            aliases,
            dimension,
            factor,
            offset: 0.0,
        }
    }

    pub fn is_offset(&self) -> bool {
        self.offset != 0.0
    }

    fn matches(&self, name: &str) -> bool {
        self.symbol == name || self.aliases.contains(&name)
    }
}

static REGISTRY: OnceLock<Vec<UnitDef>> = OnceLock::new();

/// All known units, built once.
pub fn registry() -> &'static [UnitDef] {
    REGISTRY.get_or_init(build_registry)
}

/// Find a unit by symbol or alias (exact match).
pub fn lookup(name: &str) -> Option<&'static UnitDef> {
    registry().iter().find(|def| def.matches(name))
}

fn secs(t: Time) -> f64 {
    t.get::<time::second>()
}

fn cm(l: Length) -> f64 {
    l.get::<length::centimeter>()
}

fn ml(v: Volume) -> f64 {
    v.get::<volume::cubic_centimeter>()
}

fn kelvin(t: ThermodynamicTemperature) -> f64 {
    t.get::<thermodynamic_temperature::kelvin>()
}

fn offset_unit(
    symbol: &'static str,
    aliases: &'static [&'static str],
    zero: ThermodynamicTemperature,
    one: ThermodynamicTemperature,
) -> UnitDef {
    let offset = kelvin(zero);
    UnitDef {
        symbol,
        aliases,
        dimension: Dimension::TEMPERATURE,
        factor: kelvin(one) - offset,
        offset,
    }
}

fn build_registry() -> Vec<UnitDef> {
    use Dimension as D;

    vec![
        // time
        UnitDef::scaled(
            "s",
            &["sec", "secs", "second", "seconds"],
            D::TIME,
            secs(Time::new::<time::second>(1.0)),
        ),
        UnitDef::scaled(
            "ms",
            &["millisecond", "milliseconds"],
            D::TIME,
            secs(Time::new::<time::millisecond>(1.0)),
        ),
        UnitDef::scaled(
            "min",
            &["mins", "minute", "minutes"],
            D::TIME,
            secs(Time::new::<time::minute>(1.0)),
        ),
        UnitDef::scaled(
            "h",
            &["hr", "hrs", "hour", "hours"],
            D::TIME,
            secs(Time::new::<time::hour>(1.0)),
        ),
        UnitDef::scaled(
            "day",
            &["days"],
            D::TIME,
            secs(Time::new::<time::day>(1.0)),
        ),
        // length
        UnitDef::scaled(
            "m",
            &["meter", "meters", "metre", "metres"],
            D::LENGTH,
            cm(Length::new::<length::meter>(1.0)),
        ),
        UnitDef::scaled(
            "cm",
            &["centimeter", "centimeters", "centimetre"],
            D::LENGTH,
            cm(Length::new::<length::centimeter>(1.0)),
        ),
        UnitDef::scaled(
            "mm",
            &["millimeter", "millimeters", "millimetre"],
            D::LENGTH,
            cm(Length::new::<length::millimeter>(1.0)),
        ),
        UnitDef::scaled(
            "um",
            &["µm", "micrometer", "micrometers", "micron", "microns"],
            D::LENGTH,
            cm(Length::new::<length::micrometer>(1.0)),
        ),
        UnitDef::scaled(
            "in",
            &["inch", "inches"],
            D::LENGTH,
            cm(Length::new::<length::inch>(1.0)),
        ),
        UnitDef::scaled(
            "ft",
            &["foot", "feet"],
            D::LENGTH,
            cm(Length::new::<length::foot>(1.0)),
        ),
        // volume
        UnitDef::scaled(
            "L",
            &["l", "liter", "liters", "litre", "litres"],
            D::VOLUME,
            ml(Volume::new::<volume::liter>(1.0)),
        ),
        UnitDef::scaled(
            "mL",
            &["ml", "cc", "milliliter", "milliliters", "millilitre"],
            D::VOLUME,
            ml(Volume::new::<volume::milliliter>(1.0)),
        ),
        UnitDef::scaled(
            "uL",
            &["ul", "µL", "µl", "microliter", "microliters"],
            D::VOLUME,
            ml(Volume::new::<volume::microliter>(1.0)),
        ),
        // frequency
        UnitDef::scaled(
            "Hz",
            &["hz", "hertz"],
            D::FREQUENCY,
            Frequency::new::<frequency::hertz>(1.0).get::<frequency::hertz>(),
        ),
        UnitDef::scaled(
            "kHz",
            &["khz", "kilohertz"],
            D::FREQUENCY,
            Frequency::new::<frequency::kilohertz>(1.0).get::<frequency::hertz>(),
        ),
        // temperature
        UnitDef::scaled(
            "K",
            &["kelvin"],
            D::TEMPERATURE,
            kelvin(ThermodynamicTemperature::new::<thermodynamic_temperature::kelvin>(
                1.0,
            )),
        ),
        offset_unit(
            "degC",
            &["°C", "celsius", "degree_Celsius", "degrees_Celsius"],
            ThermodynamicTemperature::new::<thermodynamic_temperature::degree_celsius>(0.0),
            ThermodynamicTemperature::new::<thermodynamic_temperature::degree_celsius>(1.0),
        ),
        offset_unit(
            "degF",
            &["°F", "fahrenheit", "degree_Fahrenheit", "degrees_Fahrenheit"],
            ThermodynamicTemperature::new::<thermodynamic_temperature::degree_fahrenheit>(0.0),
            ThermodynamicTemperature::new::<thermodynamic_temperature::degree_fahrenheit>(1.0),
        ),
        // mass
        UnitDef::scaled(
            "g",
            &["gram", "grams"],
            D::MASS,
            Mass::new::<mass::gram>(1.0).get::<mass::gram>(),
        ),
        UnitDef::scaled(
            "kg",
            &["kilogram", "kilograms"],
            D::MASS,
            Mass::new::<mass::kilogram>(1.0).get::<mass::gram>(),
        ),
        UnitDef::scaled(
            "mg",
            &["milligram", "milligrams"],
            D::MASS,
            Mass::new::<mass::milligram>(1.0).get::<mass::gram>(),
        ),
    ]
}
