//! Appointment list, upcoming soonest first, then past most recent first.

use log::info;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::activity_model::Appointment;
use super::day_boundary::DayBoundary;
use crate::sync::{PersistentLocalStore, RecordKey};

pub struct AppointmentBook {
    local_store: Arc<PersistentLocalStore>,
    clock: Arc<dyn DayBoundary>,
    appointments: RwLock<Vec<Appointment>>,
}

impl AppointmentBook {
    pub fn new(local_store: Arc<PersistentLocalStore>, clock: Arc<dyn DayBoundary>) -> Self {
        let appointments = local_store
            .load(RecordKey::Appointments)
            .unwrap_or_default();
        Self {
            local_store,
            clock,
            appointments: RwLock::new(appointments),
        }
    }

    pub async fn add(&self, appointment: Appointment) {
        let mut appointments = self.appointments.write().await;
        appointments.push(appointment);
        self.persist(&appointments).await;
    }

    /// Replace the appointment with the same id. Returns false if unknown.
    pub async fn update(&self, appointment: Appointment) -> bool {
        let mut appointments = self.appointments.write().await;
        let Some(existing) = appointments.iter_mut().find(|a| a.id == appointment.id) else {
            return false;
        };
        *existing = appointment;
        self.persist(&appointments).await;
        true
    }

    pub async fn delete(&self, id: Uuid) -> bool {
        let mut appointments = self.appointments.write().await;
        let before = appointments.len();
        appointments.retain(|a| a.id != id);
        if appointments.len() == before {
            return false;
        }
        self.persist(&appointments).await;
        true
    }

    /// All appointments in display order relative to the current time.
    pub async fn list(&self) -> Vec<Appointment> {
        let mut appointments = self.appointments.read().await.clone();
        sort_for_display(&mut appointments, self.clock.now());
        appointments
    }

    pub async fn upcoming(&self) -> Vec<Appointment> {
        let now = self.clock.now();
        self.list()
            .await
            .into_iter()
            .filter(|a| a.date >= now)
            .collect()
    }

    pub async fn clear(&self) {
        self.appointments.write().await.clear();
        self.local_store.delete(RecordKey::Appointments).await;
        info!("[Appointments] Cleared all appointments");
    }

    async fn persist(&self, appointments: &[Appointment]) {
        self.local_store
            .save(RecordKey::Appointments, &appointments)
            .await;
    }
}

fn sort_for_display(appointments: &mut [Appointment], now: chrono::DateTime<chrono::Utc>) {
    appointments.sort_by(|a, b| {
        match (a.date >= now, b.date >= now) {
            (true, true) => a.date.cmp(&b.date),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => b.date.cmp(&a.date),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{AppointmentKind, FixedDayBoundary};
    use crate::sync::test_support::MemoryRecordRepository;
    use chrono::{Duration, TimeZone, Utc};

    fn new_book(records: Arc<MemoryRecordRepository>) -> AppointmentBook {
        let now = Utc.with_ymd_and_hms(2026, 6, 15, 10, 0, 0).unwrap();
        AppointmentBook::new(
            Arc::new(PersistentLocalStore::new(records)),
            Arc::new(FixedDayBoundary::utc(now)),
        )
    }

    fn at(days: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 10, 0, 0).unwrap() + Duration::days(days)
    }

    #[tokio::test]
    async fn upcoming_soonest_first_then_recent_past() {
        let book = new_book(Arc::new(MemoryRecordRepository::default()));
        for (title, days) in [("far", 30), ("old", -40), ("soon", 2), ("recent", -3)] {
            book.add(Appointment::new(title, at(days), AppointmentKind::DoctorVisit))
                .await;
        }

        let titles: Vec<String> = book.list().await.into_iter().map(|a| a.title).collect();
        assert_eq!(titles, vec!["soon", "far", "recent", "old"]);

        let upcoming: Vec<String> = book.upcoming().await.into_iter().map(|a| a.title).collect();
        assert_eq!(upcoming, vec!["soon", "far"]);
    }

    #[tokio::test]
    async fn update_and_delete_by_id() {
        let records = Arc::new(MemoryRecordRepository::default());
        let book = new_book(records.clone());
        let mut scan = Appointment::new("Neck ultrasound", at(5), AppointmentKind::ImagingScan);
        book.add(scan.clone()).await;

        scan.location = Some("Radiology, 2nd floor".to_string());
        assert!(book.update(scan.clone()).await);
        assert!(!book
            .update(Appointment::new("unknown", at(1), AppointmentKind::Other))
            .await);

        let restored = new_book(records);
        assert_eq!(restored.list().await, vec![scan.clone()]);

        assert!(book.delete(scan.id).await);
        assert!(!book.delete(scan.id).await);
        assert!(book.list().await.is_empty());
    }
}
