use chrono::Utc;
use sea_orm::entity::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

pub trait HasIdActiveModel {
    fn set_id(&mut self, id: Uuid);
}

pub trait TimestampedActiveModel {
    fn set_created_at(&mut self, ts: DateTimeWithTimeZone);
    fn set_updated_at(&mut self, ts: DateTimeWithTimeZone);
}

/// Assigns a fresh id and stamps both timestamps on a row about to be inserted.
pub fn stamp_new<A>(active: &mut A)
where
    A: HasIdActiveModel + TimestampedActiveModel,
{
    let now = Utc::now().fixed_offset();
    active.set_id(Uuid::new_v4());
    active.set_created_at(now);
    active.set_updated_at(now);
}

pub fn touch<A: TimestampedActiveModel>(active: &mut A) {
    active.set_updated_at(Utc::now().fixed_offset());
}

/// Wires an entity module's `ActiveModel` with `id`/`created_at`/`updated_at`
/// fields into the DAO traits.
#[macro_export]
macro_rules! timestamped_entity {
    () => {
        impl $crate::db::dao::base_traits::HasIdActiveModel for ActiveModel {
            fn set_id(&mut self, id: uuid::Uuid) {
                self.id = sea_orm::ActiveValue::Set(id);
            }
        }

        impl $crate::db::dao::base_traits::TimestampedActiveModel for ActiveModel {
            fn set_created_at(&mut self, ts: sea_orm::entity::prelude::DateTimeWithTimeZone) {
                self.created_at = sea_orm::ActiveValue::Set(ts);
            }

            fn set_updated_at(&mut self, ts: sea_orm::entity::prelude::DateTimeWithTimeZone) {
                self.updated_at = sea_orm::ActiveValue::Set(ts);
            }
        }
    };
}
