use tokio_modbus::ExceptionCode;

/// 每台空调在自身地址窗口内的保持寄存器偏移
pub const REG_MODE: u16 = 0;
pub const REG_TEMP: u16 = 1;
pub const REG_TIMER: u16 = 2;
pub const REG_FAN: u16 = 3;
pub const HOLDING_COUNT: u16 = 4;

/// 线圈偏移(可写开关量)
pub const COIL_POWER: u16 = 0;
pub const COIL_SWING: u16 = 1;
pub const COIL_COUNT: u16 = 2;

/// 离散输入偏移(只读状态量)
pub const INPUT_POWERED: u16 = 0;
pub const INPUT_COMP_RUNNING: u16 = 1;
pub const INPUT_TIMER_RUNNING: u16 = 2;
pub const DISCRETE_COUNT: u16 = 3;

pub const MODE_MAX: u16 = 4;
pub const TEMP_MAX: u16 = 14;
pub const TIMER_MAX: u16 = 34;
pub const FAN_MAX: u16 = 3;

/// 单台空调的内存状态, 启动时清零, 由写请求原地修改
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnitState {
    pub mode: u16,
    pub temp: u16,
    pub timer: u16,
    pub fan: u16,
    pub power: bool,
    pub swing: bool,
    pub powered: bool,
    pub comp_running: bool,
    pub timer_running: bool,
}

impl UnitState {
    pub fn holding(&self, offset: u16) -> Option<u16> {
        match offset {
            REG_MODE => Some(self.mode),
            REG_TEMP => Some(self.temp),
            REG_TIMER => Some(self.timer),
            REG_FAN => Some(self.fan),
            _ => None,
        }
    }

    /// 调用前必须通过 [`validate_holding`] 校验
    pub fn set_holding(&mut self, offset: u16, value: u16) {
        match offset {
            REG_MODE => self.mode = value,
            REG_TEMP => self.temp = value,
            REG_TIMER => self.timer = value,
            REG_FAN => self.fan = value,
            _ => {}
        }
    }

    pub fn coil(&self, offset: u16) -> Option<bool> {
        match offset {
            COIL_POWER => Some(self.power),
            COIL_SWING => Some(self.swing),
            _ => None,
        }
    }

    pub fn set_coil(&mut self, offset: u16, on: bool) {
        match offset {
            COIL_POWER => self.power = on,
            COIL_SWING => self.swing = on,
            _ => {}
        }
    }

    pub fn discrete_input(&self, offset: u16) -> Option<bool> {
        match offset {
            INPUT_POWERED => Some(self.powered),
            INPUT_COMP_RUNNING => Some(self.comp_running),
            INPUT_TIMER_RUNNING => Some(self.timer_running),
            _ => None,
        }
    }
}

/// 保持寄存器写入校验: 偏移越界 -> IllegalDataAddress, 取值越界 -> IllegalDataValue
pub fn validate_holding(offset: u16, value: u16) -> Result<(), ExceptionCode> {
    let max = match offset {
        REG_MODE => MODE_MAX,
        REG_TEMP => TEMP_MAX,
        REG_TIMER => TIMER_MAX,
        REG_FAN => FAN_MAX,
        _ => return Err(ExceptionCode::IllegalDataAddress),
    };
    if value > max {
        return Err(ExceptionCode::IllegalDataValue);
    }
    Ok(())
}
