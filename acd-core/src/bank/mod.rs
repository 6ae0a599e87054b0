use std::sync::RwLock;

use tokio_modbus::ExceptionCode;
use tracing::warn;

use crate::core::unit::{
    COIL_COUNT, DISCRETE_COUNT, HOLDING_COUNT, UnitState, validate_holding,
};

/// 全部空调单元的内存状态表
///
/// Modbus地址按固定步长切分到各单元: `unit = addr / increment`,
/// `offset = addr % increment`. 读写请求不允许跨出单元内已映射的
/// 偏移窗口, 也不会悄悄落到下一台空调上.
pub struct UnitBank {
    increment: u16,
    units: RwLock<Vec<UnitState>>,
}

impl UnitBank {
    /// `increment` 必须不小于最大偏移窗口(保持寄存器数), 由配置层保证
    pub fn new(units: u16, increment: u16) -> Self {
        UnitBank {
            increment,
            units: RwLock::new(vec![UnitState::default(); units as usize]),
        }
    }

    pub fn unit_count(&self) -> usize {
        match self.units.read() {
            Ok(guard) => guard.len(),
            Err(_) => 0,
        }
    }

    /// 地址归一化: 越过最后一台空调 -> IllegalDataAddress
    fn locate(&self, addr: u16, unit_len: usize) -> Result<(usize, u16), ExceptionCode> {
        let unit = (addr / self.increment) as usize;
        if unit >= unit_len {
            return Err(ExceptionCode::IllegalDataAddress);
        }
        Ok((unit, addr % self.increment))
    }

    fn check_window(offset: u16, cnt: usize, window: u16) -> Result<(), ExceptionCode> {
        // 数量为0的请求保持原有的空转语义
        if cnt == 0 {
            return Ok(());
        }
        if offset as usize + cnt > window as usize {
            return Err(ExceptionCode::IllegalDataAddress);
        }
        Ok(())
    }

    /// FC3 (以及FC23的读半程)
    pub fn read_holding(&self, addr: u16, cnt: u16) -> Result<Vec<u16>, ExceptionCode> {
        let guard = self
            .units
            .read()
            .map_err(|_| ExceptionCode::ServerDeviceFailure)?;
        let (unit, offset) = self.locate(addr, guard.len())?;
        Self::check_window(offset, cnt as usize, HOLDING_COUNT)?;
        let mut out = Vec::with_capacity(cnt as usize);
        for i in offset..offset + cnt {
            match guard[unit].holding(i) {
                Some(v) => out.push(v),
                None => return Err(ExceptionCode::IllegalDataAddress),
            }
        }
        Ok(out)
    }

    /// FC1
    pub fn read_coils(&self, addr: u16, cnt: u16) -> Result<Vec<bool>, ExceptionCode> {
        let guard = self
            .units
            .read()
            .map_err(|_| ExceptionCode::ServerDeviceFailure)?;
        let (unit, offset) = self.locate(addr, guard.len())?;
        Self::check_window(offset, cnt as usize, COIL_COUNT)?;
        let mut out = Vec::with_capacity(cnt as usize);
        for i in offset..offset + cnt {
            match guard[unit].coil(i) {
                Some(v) => out.push(v),
                None => return Err(ExceptionCode::IllegalDataAddress),
            }
        }
        Ok(out)
    }

    /// FC2
    pub fn read_discrete_inputs(&self, addr: u16, cnt: u16) -> Result<Vec<bool>, ExceptionCode> {
        let guard = self
            .units
            .read()
            .map_err(|_| ExceptionCode::ServerDeviceFailure)?;
        let (unit, offset) = self.locate(addr, guard.len())?;
        Self::check_window(offset, cnt as usize, DISCRETE_COUNT)?;
        let mut out = Vec::with_capacity(cnt as usize);
        for i in offset..offset + cnt {
            match guard[unit].discrete_input(i) {
                Some(v) => out.push(v),
                None => return Err(ExceptionCode::IllegalDataAddress),
            }
        }
        Ok(out)
    }

    /// FC6/FC16 (以及FC23的写半程)
    ///
    /// 先整体校验地址与取值, 全部合法才提交, 不允许半截写入
    pub fn write_registers(&self, addr: u16, values: &[u16]) -> Result<(), ExceptionCode> {
        let mut guard = self
            .units
            .write()
            .map_err(|_| ExceptionCode::ServerDeviceFailure)?;
        let (unit, offset) = self.locate(addr, guard.len())?;
        Self::check_window(offset, values.len(), HOLDING_COUNT)?;
        for (i, value) in values.iter().enumerate() {
            validate_holding(offset + i as u16, *value)?;
        }
        for (i, value) in values.iter().enumerate() {
            guard[unit].set_holding(offset + i as u16, *value);
        }
        Ok(())
    }

    /// FC5/FC15, 线圈取值由协议层解码为bool, 这里只校验地址窗口
    pub fn write_coils(&self, addr: u16, values: &[bool]) -> Result<(), ExceptionCode> {
        let mut guard = self
            .units
            .write()
            .map_err(|_| ExceptionCode::ServerDeviceFailure)?;
        let (unit, offset) = self.locate(addr, guard.len())?;
        Self::check_window(offset, values.len(), COIL_COUNT)?;
        for (i, on) in values.iter().enumerate() {
            guard[unit].set_coil(offset + i as u16, *on);
        }
        Ok(())
    }

    /// 供驱动层回写运行状态(上电/压缩机/定时), 超界单元忽略并告警
    pub fn apply_status(&self, unit: usize, powered: bool, comp_running: bool, timer_running: bool) {
        let Ok(mut guard) = self.units.write() else {
            return;
        };
        let Some(st) = guard.get_mut(unit) else {
            warn!("状态回写越界: unit={}", unit);
            return;
        };
        st.powered = powered;
        st.comp_running = comp_running;
        st.timer_running = timer_running;
    }

    pub fn snapshot(&self, unit: usize) -> Option<UnitState> {
        let guard = self.units.read().ok()?;
        guard.get(unit).copied()
    }
}
