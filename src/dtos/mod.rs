pub mod filedtos;
pub mod jobdtos;
pub mod messagedtos;
pub mod proposaldtos;
pub mod userdtos;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            status: "success",
            data,
        }
    }
}
