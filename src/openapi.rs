use utoipa::OpenApi;

use crate::form::{CourseRow, DayWindow};
use crate::handlers::{DayInputs, FormView};
use crate::models::{ValidationError, ValidationReport};
use crate::render::{ProfessorRow, ScheduleRow};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::get_form,
        crate::handlers::get_schedule,
        crate::handlers::get_professors,
        crate::handlers::get_validation
    ),
    components(schemas(
        CourseRow,
        DayWindow,
        DayInputs,
        FormView,
        ScheduleRow,
        ProfessorRow,
        ValidationError,
        ValidationReport
    )),
    tags(
        (name = "scheduler", description = "Course schedule form state and results")
    ),
)]
pub struct ApiDoc;
