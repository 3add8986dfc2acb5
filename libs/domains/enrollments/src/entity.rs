//! Sea-ORM entities for the students, courses and enrollments tables.

use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub mod student {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "students")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub name: String,
        pub email: String,
        #[sea_orm(unique)]
        pub enrollment_code: String,
        pub created_at: DateTimeWithTimeZone,
        pub updated_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::enrollment::Entity")]
        Enrollments,
    }

    impl Related<super::enrollment::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Enrollments.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl From<Model> for crate::models::Student {
        fn from(model: Model) -> Self {
            Self {
                id: model.id,
                name: model.name,
                email: model.email,
                enrollment_code: model.enrollment_code,
                created_at: model.created_at.into(),
                updated_at: model.updated_at.into(),
            }
        }
    }

    impl From<crate::models::Student> for ActiveModel {
        fn from(student: crate::models::Student) -> Self {
            ActiveModel {
                id: Set(student.id),
                name: Set(student.name),
                email: Set(student.email),
                enrollment_code: Set(student.enrollment_code),
                created_at: Set(student.created_at.into()),
                updated_at: Set(student.updated_at.into()),
            }
        }
    }
}

pub mod course {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "courses")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(unique)]
        pub code: String,
        pub name: String,
        #[sea_orm(column_type = "Text")]
        pub description: String,
        pub workload: i32,
        pub prerequisites: Json, // JSONB array of course codes
        pub created_at: DateTimeWithTimeZone,
        pub updated_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::enrollment::Entity")]
        Enrollments,
    }

    impl Related<super::enrollment::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Enrollments.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl From<Model> for crate::models::Course {
        fn from(model: Model) -> Self {
            let prerequisites: Vec<String> =
                serde_json::from_value(model.prerequisites).unwrap_or_default();

            Self {
                id: model.id,
                code: model.code,
                name: model.name,
                description: model.description,
                workload: model.workload.max(0) as u32,
                prerequisites,
                created_at: model.created_at.into(),
                updated_at: model.updated_at.into(),
            }
        }
    }

    impl From<crate::models::Course> for ActiveModel {
        fn from(course: crate::models::Course) -> Self {
            let prerequisites =
                serde_json::to_value(&course.prerequisites).unwrap_or(Json::Array(vec![]));

            ActiveModel {
                id: Set(course.id),
                code: Set(course.code),
                name: Set(course.name),
                description: Set(course.description),
                workload: Set(course.workload as i32),
                prerequisites: Set(prerequisites),
                created_at: Set(course.created_at.into()),
                updated_at: Set(course.updated_at.into()),
            }
        }
    }
}

pub mod enrollment {
    use super::*;
    use crate::models::EnrollmentStatus;

    // The (student_id, course_id) unique key backstops the service-level
    // duplicate check when two enrolls for the same pair race.
    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "enrollments")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(unique_key = "student_course")]
        pub student_id: Uuid,
        #[sea_orm(unique_key = "student_course")]
        pub course_id: Uuid,
        pub status: EnrollmentStatus,
        pub grade: Option<f64>,
        pub enrolled_at: DateTimeWithTimeZone,
        pub completed_at: Option<DateTimeWithTimeZone>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::student::Entity",
            from = "Column::StudentId",
            to = "super::student::Column::Id"
        )]
        Student,
        #[sea_orm(
            belongs_to = "super::course::Entity",
            from = "Column::CourseId",
            to = "super::course::Column::Id"
        )]
        Course,
    }

    impl Related<super::student::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Student.def()
        }
    }

    impl Related<super::course::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Course.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl From<Model> for crate::models::Enrollment {
        fn from(model: Model) -> Self {
            Self {
                id: model.id,
                student_id: model.student_id,
                course_id: model.course_id,
                status: model.status,
                grade: model.grade,
                enrolled_at: model.enrolled_at.into(),
                completed_at: model.completed_at.map(Into::into),
            }
        }
    }

    impl From<crate::models::Enrollment> for ActiveModel {
        fn from(enrollment: crate::models::Enrollment) -> Self {
            ActiveModel {
                id: Set(enrollment.id),
                student_id: Set(enrollment.student_id),
                course_id: Set(enrollment.course_id),
                status: Set(enrollment.status),
                grade: Set(enrollment.grade),
                enrolled_at: Set(enrollment.enrolled_at.into()),
                completed_at: Set(enrollment.completed_at.map(Into::into)),
            }
        }
    }
}
