//! Human-readable tables and prose for an apparatus.

use std::fmt::Write;

use rf_core::Quantity;

use crate::apparatus::{Apparatus, ComponentEntry};

fn add_all<'a>(quantities: impl Iterator<Item = &'a Quantity>) -> Option<Quantity> {
    let mut total: Option<Quantity> = None;
    for q in quantities {
        total = match total {
            None => Some(q.clone()),
            Some(t) => t.try_add(q).ok(),
        };
    }
    total
}

impl Apparatus {
    /// Components table followed by a tubing table with totals.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Apparatus: {}", self.name);
        if let Some(description) = &self.description {
            let _ = writeln!(out, "{description}");
        }

        let _ = writeln!(out, "\nComponents");
        let _ = writeln!(out, "{:<20} {:<14}", "Name", "Type");
        for c in &self.components {
            let _ = writeln!(out, "{:<20} {:<14}", c.name(), c.kind_label());
        }

        if self.connections.is_empty() {
            return out;
        }

        let _ = writeln!(out, "\nTubing");
        let _ = writeln!(
            out,
            "{:<16} {:<16} {:>12} {:>10} {:>10} {:<8} {:>14}",
            "From", "To", "Length", "ID", "OD", "Material", "Volume"
        );
        for conn in &self.connections {
            let t = &conn.tube;
            let _ = writeln!(
                out,
                "{:<16} {:<16} {:>12} {:>10} {:>10} {:<8} {:>14}",
                self.name_of(conn.from).unwrap_or("?"),
                self.name_of(conn.to).unwrap_or("?"),
                t.length.to_string(),
                t.inner_diameter.to_string(),
                t.outer_diameter.to_string(),
                t.material,
                format!("{:.4} mL", t.volume.value()),
            );
        }

        let length = add_all(self.connections.iter().map(|c| &c.tube.length))
            .and_then(|q| q.convert_to("m").ok());
        let volume = add_all(self.connections.iter().map(|c| &c.tube.volume));
        if let (Some(length), Some(volume)) = (length, volume) {
            let _ = writeln!(
                out,
                "Total: {:.3} m of tubing, {:.4} mL",
                length.value(),
                volume.value()
            );
        }
        out
    }

    /// One sentence per connection, naming both ends and the tubing.
    pub fn describe(&self) -> String {
        let mut sentences = Vec::with_capacity(self.connections.len() + 1);
        let active = self.active_components().count();
        sentences.push(format!(
            "'{}' has {} components ({} active) and {} connections.",
            self.name,
            self.components.len(),
            active,
            self.connections.len()
        ));
        for conn in &self.connections {
            let t = &conn.tube;
            sentences.push(format!(
                "A {} length of {} outer diameter, {} inner diameter {} tubing connects {} to {}.",
                t.length,
                t.outer_diameter,
                t.inner_diameter,
                t.material,
                self.phrase(conn.from),
                self.phrase(conn.to),
            ));
        }
        sentences.join(" ")
    }

    fn phrase(&self, id: rf_core::ComponentId) -> String {
        match self.component(id) {
            Some(ComponentEntry::Passive { component, .. }) => {
                format!("{} ({})", component.name(), component.describe())
            }
            Some(entry) => format!("{} ({})", entry.name(), entry.kind_label()),
            None => id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rf_components::{PassiveComponent, Pump, Tube};

    use crate::builder::ApparatusBuilder;

    #[test]
    fn summary_lists_tubing_totals() {
        let mut b = ApparatusBuilder::new("demo");
        let p = b.add_active(Pump::new("P1"));
        let v = b.add_passive(PassiveComponent::vessel("flask", "toluene"));
        b.connect(p, v, Tube::new("50 cm", "1 mm", "2 mm", "PFA").unwrap());
        b.connect(v, p, Tube::new("0.5 m", "1 mm", "2 mm", "PFA").unwrap());
        let app = b.build().unwrap();

        let s = app.summary();
        assert!(s.contains("P1"));
        assert!(s.contains("flask"));
        assert!(s.contains("Total: 1.000 m of tubing"));
    }

    #[test]
    fn describe_names_both_ends() {
        let mut b = ApparatusBuilder::new("demo");
        let p = b.add_active(Pump::new("P1"));
        let v = b.add_passive(PassiveComponent::vessel("flask", "toluene"));
        b.connect(p, v, Tube::new("1 m", "1 mm", "2 mm", "PFA").unwrap());
        let text = b.build().unwrap().describe();
        assert!(text.contains("connects P1 (pump) to flask (a vessel containing toluene)"));
    }
}
